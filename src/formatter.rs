//! Console rendering of log events
//!
//! Used by the console sink when no ingestion endpoint is configured.

use crate::event::{LogEvent, LogLevel};
use colored::{ColoredString, Colorize};
use serde::Serialize;

/// Render one event as console text.
///
/// Compact mode is a single line: `level - message {fields}`.
/// Pretty mode colorizes the level and expands fields/request/response below it.
pub fn render(event: &LogEvent, pretty: bool) -> String {
    if !pretty {
        return render_compact(event);
    }

    let mut out = format!("{} - {}", colorize_level(event.level), event.message);

    if !event.fields.is_empty() {
        push_block(&mut out, "fields", &event.fields);
    }
    if let Some(request) = &event.request {
        push_block(&mut out, "request", request);
    }
    if let Some(response) = &event.response {
        push_block(&mut out, "response", response);
    }

    out
}

/// Write one event to the console
pub fn pretty_print(event: &LogEvent, pretty: bool) {
    let line = render(event, pretty);
    match event.level {
        LogLevel::Warn | LogLevel::Error => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

fn render_compact(event: &LogEvent) -> String {
    let mut line = format!("{} - {}", event.level, event.message);
    if !event.fields.is_empty() {
        let fields = serde_json::to_string(&event.fields).unwrap_or_else(|_| "{}".to_string());
        line.push(' ');
        line.push_str(&fields);
    }
    line
}

fn colorize_level(level: LogLevel) -> ColoredString {
    let label = level.as_str();
    match level {
        LogLevel::Debug => label.cyan(),
        LogLevel::Info => label.green(),
        LogLevel::Warn => label.yellow().bold(),
        LogLevel::Error => label.red().bold(),
        LogLevel::Off => label.normal(),
    }
}

fn push_block<T: Serialize>(out: &mut String, label: &str, value: &T) {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out.push_str(&format!("  {}: ", label.dimmed()));
    out.push_str(&body.replace('\n', "\n  "));
}
