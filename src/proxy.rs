//! Ingest proxy route
//!
//! Services configured with `REQLOG_PROXY_URL` post their batches here; this
//! service forwards them through its own sink, which holds the ingest token.

use crate::config::PROXY_PATH;
use crate::error::ReqlogError;
use crate::event::LogEvent;
use crate::transport::LogSink;
use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProxyState {
    pub sink: Arc<dyn LogSink>,
}

/// Router exposing `POST /_reqlog/logs`
pub fn router(sink: Arc<dyn LogSink>) -> Router {
    Router::new()
        .route(PROXY_PATH, post(forward_batch))
        .with_state(ProxyState { sink })
}

/// Forward one batch; 204 when delivered
pub async fn forward_batch(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<StatusCode, ReqlogError> {
    let events: Vec<LogEvent> = serde_json::from_slice(&body)?;
    if events.is_empty() {
        return Ok(StatusCode::NO_CONTENT);
    }

    let count = events.len();
    state.sink.send(events).await.map_err(|e| {
        tracing::error!(error = %e, count = count, "Failed to forward proxied log batch");
        ReqlogError::from(e)
    })?;

    tracing::debug!(count = count, sink = state.sink.name(), "Forwarded proxied log batch");
    Ok(StatusCode::NO_CONTENT)
}
