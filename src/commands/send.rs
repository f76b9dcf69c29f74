use anyhow::{Context, Result};
use colored::Colorize;
use reqlog::{config, Fields, LogLevel, LogValue, Logger};
use std::path::Path;
use tracing::info;

/// Execute the send command
///
/// Logs a single event with auto-flush off, then flushes explicitly so the
/// process does not exit before delivery.
pub async fn execute(
    config_path: &Path,
    level: &str,
    raw_fields: &[String],
    message: String,
) -> Result<()> {
    let mut cfg = config::load_config(Some(config_path))?;
    cfg.auto_flush = false;

    let level: LogLevel = level.parse().map_err(anyhow::Error::msg)?;
    if level == LogLevel::Off {
        anyhow::bail!("cannot send an event at level 'off'");
    }
    let fields = parse_fields(raw_fields)?;

    let logger = Logger::new(&cfg);
    logger.log(level, message, fields);
    logger.flush().await;

    info!(level = %level, "Event sent");
    println!("{}", "✓ Event flushed".green());
    Ok(())
}

/// Parse `key=value` pairs; values that look like numbers or booleans keep their type
fn parse_fields(raw: &[String]) -> Result<Fields> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("field '{}' is not in key=value form", pair))?;
            if key.is_empty() {
                anyhow::bail!("field '{}' has an empty key", pair);
            }
            Ok((key.to_string(), parse_value(value)))
        })
        .collect()
}

fn parse_value(value: &str) -> LogValue {
    if let Ok(i) = value.parse::<i64>() {
        return LogValue::Int(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        if f.is_finite() {
            return LogValue::Float(f);
        }
    }
    match value {
        "true" => LogValue::Bool(true),
        "false" => LogValue::Bool(false),
        _ => LogValue::from(value),
    }
}
