//! Batch delivery
//!
//! A drained batch is handed to a [`LogSink`]. With an ingest endpoint the
//! batch becomes one JSON POST; without one it is printed through the
//! formatter and the network is never touched.

use crate::config::{IngestTarget, LoggerConfig};
use crate::event::LogEvent;
use crate::formatter;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Delivery failure for one batch
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to encode log batch: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("ingest request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ingest endpoint returned {0}")]
    Status(StatusCode),
    #[error("failed to write log batch: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for drained batches
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    /// Short name used in diagnostics ("http", "console", ...)
    fn name(&self) -> &str;

    /// Deliver one batch. Implementations must not retry.
    async fn send(&self, events: Vec<LogEvent>) -> Result<(), TransportError>;
}

/// Posts batches to an ingestion endpoint
pub struct HttpSink {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(client: Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LogSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, events: Vec<LogEvent>) -> Result<(), TransportError> {
        let body = serde_json::to_vec(&events)?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONNECTION, "keep-alive")
            .header(
                header::USER_AGENT,
                concat!("reqlog/", env!("CARGO_PKG_VERSION")),
            )
            .body(body);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        tracing::debug!(count = events.len(), endpoint = %self.endpoint, "Flushed log batch");
        Ok(())
    }
}

/// Prints every event through the formatter
///
/// Writes to stdout/stderr by default; [`ConsoleSink::with_writer`] sends
/// every rendered event to one writer instead, one line-block per event.
pub struct ConsoleSink {
    pretty: bool,
    writer: Option<Mutex<Box<dyn Write + Send>>>,
}

impl ConsoleSink {
    pub fn new(pretty: bool) -> Self {
        Self {
            pretty,
            writer: None,
        }
    }

    pub fn with_writer(pretty: bool, writer: Box<dyn Write + Send>) -> Self {
        Self {
            pretty,
            writer: Some(Mutex::new(writer)),
        }
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, events: Vec<LogEvent>) -> Result<(), TransportError> {
        let Some(writer) = &self.writer else {
            for event in &events {
                formatter::pretty_print(event, self.pretty);
            }
            return Ok(());
        };

        let mut writer = writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for event in &events {
            writeln!(writer, "{}", formatter::render(event, self.pretty))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Build the sink the configuration asks for
pub fn sink_from_config(config: &LoggerConfig) -> Arc<dyn LogSink> {
    match config.ingest_target() {
        IngestTarget::Remote { endpoint, token } => {
            Arc::new(HttpSink::new(Client::new(), endpoint, Some(token)))
        }
        IngestTarget::Proxy { endpoint } => Arc::new(HttpSink::new(Client::new(), endpoint, None)),
        IngestTarget::Console => Arc::new(ConsoleSink::new(config.pretty_print())),
    }
}
