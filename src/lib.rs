pub mod config;
pub mod error;
pub mod event;
pub mod formatter;
pub mod layer;
pub mod logger;
pub mod middleware;
pub mod proxy;
pub mod server;
pub mod throttle;
pub mod transport;

pub use config::{load_config, IngestTarget, LoggerConfig};
pub use event::{Fields, LogEvent, LogLevel, LogValue, RequestReport, ResponseReport};
pub use logger::{Logger, LoggerOptions};
pub use transport::{ConsoleSink, HttpSink, LogSink, TransportError};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// Note: This function can only be called once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Initialize tracing with `tracing` events also shipped through `logger`
///
/// Use instead of [`init_tracing`] when the process should forward its own
/// `tracing` output to the ingest endpoint.
pub fn init_tracing_with_forwarding(logger: Logger) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(layer::ForwardingLayer::new(logger));

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: Failed to install forwarding layer: {}", e);
        eprintln!("Logs will only be written to console");
    }
}
