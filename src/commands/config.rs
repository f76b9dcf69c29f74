use anyhow::Result;
use colored::Colorize;
use reqlog::config::{self, LoggerConfig};
use reqlog::server::describe_target;
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the resolved configuration with the ingest token masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config(Some(config_path))?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());

    let cfg = config::load_config(Some(config_path))?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Delivery: {}", describe_target(&cfg.ingest_target()));
    println!("  Log level: {}", cfg.log_level);
    println!("  Flush interval: {}ms", cfg.flush_interval_ms);
    println!("  Pretty print: {}", cfg.pretty_print());

    info!("Configuration validation successful");
    Ok(())
}

fn sanitize_secrets(cfg: &LoggerConfig) -> LoggerConfig {
    let mut sanitized = cfg.clone();
    sanitized.token = sanitized.token.as_deref().map(mask_token);
    sanitized
}

/// Show the first 4 characters of a token, mask the rest
fn mask_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        return "***".to_string();
    }
    let visible: String = token.chars().take(4).collect();
    format!("{}***", visible)
}
