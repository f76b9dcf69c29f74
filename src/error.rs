use crate::transport::TransportError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application error types
#[derive(Debug)]
pub enum ReqlogError {
    /// Malformed log batch received by the ingest proxy
    InvalidBatch(String),
    /// Forwarding a batch to the ingest endpoint failed
    Transport(TransportError),
}

impl fmt::Display for ReqlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBatch(msg) => write!(f, "Invalid log batch: {}", msg),
            Self::Transport(err) => write!(f, "Transport error: {}", err),
        }
    }
}

impl std::error::Error for ReqlogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::InvalidBatch(_) => None,
        }
    }
}

impl IntoResponse for ReqlogError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidBatch(_) => StatusCode::BAD_REQUEST,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &ReqlogError) -> &'static str {
    match error {
        ReqlogError::InvalidBatch(_) => "invalid_batch",
        ReqlogError::Transport(_) => "transport_error",
    }
}

impl From<TransportError> for ReqlogError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<serde_json::Error> for ReqlogError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidBatch(format!("JSON error: {}", err))
    }
}
