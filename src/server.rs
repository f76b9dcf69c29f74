use anyhow::Result;
use axum::{extract::Path, middleware, routing::get, Extension, Router};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::{IngestTarget, LoggerConfig},
    fields,
    logger::Logger,
    middleware::request_logger,
    proxy,
    transport,
};

/// Start the demo server
///
/// This function:
/// 1. Builds the root logger from configuration
/// 2. Creates the Axum application (request logging + ingest proxy)
/// 3. Serves until Ctrl+C, then flushes whatever is still buffered
pub async fn start_server(config: LoggerConfig, addr: SocketAddr) -> Result<()> {
    let logger = Logger::new(&config);
    let app = create_router(&config, logger.clone());

    info!("Starting reqlog demo server on {}", addr);
    info!("Delivery target: {}", describe_target(&config.ingest_target()));

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received, draining connections...");
    })
    .await?;

    logger.flush().await;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(config: &LoggerConfig, logger: Logger) -> Router {
    let app_routes = Router::new()
        .route("/health", get(health))
        .route("/hello/:name", get(hello))
        .layer(middleware::from_fn_with_state(logger, request_logger));

    Router::new()
        .merge(app_routes)
        .merge(proxy::router(transport::sink_from_config(config)))
        .layer(TraceLayer::new_for_http())
}

pub fn describe_target(target: &IngestTarget) -> String {
    match target {
        IngestTarget::Remote { endpoint, .. } => format!("remote ({})", endpoint),
        IngestTarget::Proxy { endpoint } => format!("proxy ({})", endpoint),
        IngestTarget::Console => "console".to_string(),
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn hello(Extension(logger): Extension<Logger>, Path(name): Path<String>) -> String {
    logger.info("greeting", fields! { "name" => name.as_str() });
    format!("hello, {}", name)
}
