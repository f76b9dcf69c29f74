//! axum integration
//!
//! [`request_logger`] scopes a [`Logger`] to each inbound request: it builds a
//! [`RequestReport`], puts the request logger into the request extensions for
//! handlers to pull out with `Extension<Logger>`, logs one summary line when
//! the response is ready, stamps the response status on everything the request
//! logged, and flushes in the background.

use crate::event::{RequestReport, ResponseReport};
use crate::fields;
use crate::logger::Logger;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Instant;

/// Build a request report from the request head
pub fn request_report(parts: &Parts) -> RequestReport {
    let headers = &parts.headers;

    let host = header_str(headers, header::HOST.as_str())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let scheme = header_str(headers, "x-forwarded-proto")
        .map(str::to_string)
        .or_else(|| parts.uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| "http".to_string());

    let ip = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip").map(str::to_string))
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

    RequestReport {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        host,
        scheme,
        start_time: Utc::now().timestamp_millis(),
        status_code: None,
        ip,
        region: None,
        user_agent: header_str(headers, header::USER_AGENT.as_str()).map(str::to_string),
    }
}

/// Build a response report from a produced response
pub fn response_report(response: &Response) -> ResponseReport {
    let headers = response.headers();
    ResponseReport {
        status_code: response.status().as_u16(),
        content_type: header_str(headers, header::CONTENT_TYPE.as_str()).map(str::to_string),
        content_length: header_str(headers, header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse().ok()),
    }
}

impl Logger {
    /// Stamp the status of an axum response onto request-tagged events
    pub fn attach_response(&self, response: &Response) {
        self.attach_response_status(&response_report(response));
    }
}

/// Request logging middleware
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(middleware::from_fn_with_state(logger.clone(), request_logger));
/// ```
pub async fn request_logger(State(logger): State<Logger>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let mut report = request_report(&parts);
    if report.region.is_none() {
        report.region = logger
            .options()
            .platform
            .as_ref()
            .and_then(|p| p.region.clone());
    }

    let request_logger = logger.with_request(report);
    parts.extensions.insert(request_logger.clone());

    let started = Instant::now();
    let response = next.run(Request::from_parts(parts, body)).await;
    let status = response.status();
    let duration_ms = started.elapsed().as_millis() as u64;

    let summary = request_logger
        .request()
        .map(|r| format!("{} {} {}", r.method, r.path, status.as_u16()))
        .unwrap_or_else(|| status.to_string());
    let summary_fields = fields! { "durationMs" => duration_ms };

    match status_level(status) {
        StatusLevel::Error => request_logger.error(summary, summary_fields),
        StatusLevel::Warn => request_logger.warn(summary, summary_fields),
        StatusLevel::Info => request_logger.info(summary, summary_fields),
    }

    request_logger.attach_response(&response);

    tokio::spawn(async move {
        request_logger.flush().await;
    });

    response
}

enum StatusLevel {
    Info,
    Warn,
    Error,
}

fn status_level(status: StatusCode) -> StatusLevel {
    if status.is_server_error() {
        StatusLevel::Error
    } else if status.is_client_error() {
        StatusLevel::Warn
    } else {
        StatusLevel::Info
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
