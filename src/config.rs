use crate::event::{LogLevel, PlatformInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Path the ingest proxy listens on and proxy-mode loggers post to
pub const PROXY_PATH: &str = "/_reqlog/logs";

pub const ENV_PREFIX: &str = "REQLOG";

/// Logger configuration, loaded once at startup and passed down explicitly
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggerConfig {
    /// Ingest API base URL (or full ingest URL when no dataset is set)
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    /// Base URL of a service exposing the ingest proxy route
    #[serde(default)]
    pub proxy_url: Option<String>,
    pub log_level: LogLevel,
    pub no_pretty_print: bool,
    pub flush_interval_ms: u64,
    pub auto_flush: bool,
    pub source: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            dataset: None,
            proxy_url: None,
            log_level: LogLevel::Debug,
            no_pretty_print: false,
            flush_interval_ms: 1000,
            auto_flush: true,
            source: "server-log".to_string(),
            environment: None,
            region: None,
        }
    }
}

/// Where flushed batches go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestTarget {
    /// Remote ingestion endpoint, authenticated with a bearer token
    Remote { endpoint: String, token: String },
    /// Ingest proxy route on another service; the proxy holds the token
    Proxy { endpoint: String },
    /// No endpoint: events are printed
    Console,
}

impl LoggerConfig {
    /// Resolve the delivery target: remote, then proxy, then console.
    pub fn ingest_target(&self) -> IngestTarget {
        if let (Some(url), Some(token)) = (non_empty(&self.url), non_empty(&self.token)) {
            let base = url.trim_end_matches('/');
            let endpoint = match non_empty(&self.dataset) {
                Some(dataset) => format!("{}/v1/datasets/{}/ingest", base, dataset),
                None => base.to_string(),
            };
            return IngestTarget::Remote {
                endpoint,
                token: token.to_string(),
            };
        }

        if let Some(proxy) = non_empty(&self.proxy_url) {
            return IngestTarget::Proxy {
                endpoint: format!("{}{}", proxy.trim_end_matches('/'), PROXY_PATH),
            };
        }

        IngestTarget::Console
    }

    pub fn pretty_print(&self) -> bool {
        !self.no_pretty_print
    }

    pub fn platform(&self) -> Option<PlatformInfo> {
        let platform = PlatformInfo {
            environment: self.environment.clone(),
            region: self.region.clone(),
        };
        (!platform.is_empty()).then_some(platform)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Load configuration from defaults, an optional file, and `REQLOG_*` variables
pub fn load_config(file: Option<&Path>) -> anyhow::Result<LoggerConfig> {
    build_config(file, environment_source())
}

fn environment_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn build_config(
    file: Option<&Path>,
    environment: config::Environment,
) -> anyhow::Result<LoggerConfig> {
    let defaults = LoggerConfig::default();

    let mut builder = config::Config::builder()
        .set_default("log_level", defaults.log_level.as_str())?
        .set_default("no_pretty_print", defaults.no_pretty_print)?
        .set_default("flush_interval_ms", defaults.flush_interval_ms)?
        .set_default("auto_flush", defaults.auto_flush)?
        .set_default("source", defaults.source.as_str())?;

    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    let cfg: LoggerConfig = builder.add_source(environment).build()?.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &LoggerConfig) -> anyhow::Result<()> {
    if cfg.flush_interval_ms == 0 {
        anyhow::bail!("flush_interval_ms must be greater than zero");
    }

    if non_empty(&cfg.token).is_some() && non_empty(&cfg.url).is_none() {
        anyhow::bail!("An ingest token is configured but no ingest url");
    }

    if cfg.source.trim().is_empty() {
        anyhow::bail!("source cannot be empty");
    }

    Ok(())
}
