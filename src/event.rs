//! Log event data model
//!
//! Everything that ends up in a flushed batch is defined here:
//! - [`LogLevel`] with its threshold ordering
//! - [`LogValue`] / [`Fields`] for structured, always-serializable field bags
//! - [`LogEvent`] plus the request/response reports attached to it

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered mapping of field names to values.
pub type Fields = BTreeMap<String, LogValue>;

/// Build a [`Fields`] map inline.
///
/// ```
/// use reqlog::fields;
///
/// let f = fields! { "user" => "alice", "attempt" => 3 };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::event::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::event::Fields::new();
        $(
            map.insert(::std::string::String::from($key), $crate::event::LogValue::from($value));
        )+
        map
    }};
}

/// Severity of a log event
///
/// `Off` only exists as a threshold: a logger configured with it drops every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Debug
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// A structured field value
///
/// Serialized untagged, so a `LogValue::Int(3)` is just `3` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<LogValue>),
    Map(Fields),
}

impl LogValue {
    /// Flatten an error and its source chain into a map value
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut map = Fields::new();
        map.insert("message".to_string(), LogValue::String(err.to_string()));

        let mut sources = Vec::new();
        let mut current = err.source();
        while let Some(source) = current {
            sources.push(LogValue::String(source.to_string()));
            current = source.source();
        }
        if !sources.is_empty() {
            map.insert("sources".to_string(), LogValue::List(sources));
        }

        LogValue::Map(map)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for LogValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for LogValue {
                fn from(value: $t) -> Self {
                    Self::Int(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for LogValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Self::Int)
            .unwrap_or(Self::Float(value as f64))
    }
}

impl From<usize> for LogValue {
    fn from(value: usize) -> Self {
        Self::from(value as u64)
    }
}

impl From<f32> for LogValue {
    fn from(value: f32) -> Self {
        Self::Float(value as f64)
    }
}

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<Fields> for LogValue {
    fn from(value: Fields) -> Self {
        Self::Map(value)
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Merge `overrides` on top of `base`; keys in `overrides` win.
pub fn merge_fields(base: &Fields, overrides: Fields) -> Fields {
    let mut merged = base.clone();
    merged.extend(overrides);
    merged
}

/// Metadata about the inbound request a logger is scoped to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestReport {
    pub method: String,
    pub path: String,
    pub host: String,
    pub scheme: String,
    /// Unix milliseconds
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestReport {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        host: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            host: host.into(),
            scheme: scheme.into(),
            start_time: Utc::now().timestamp_millis(),
            status_code: None,
            ip: None,
            region: None,
            user_agent: None,
        }
    }
}

/// Metadata about the produced response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReport {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

impl ResponseReport {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            content_type: None,
            content_length: None,
        }
    }
}

/// Deployment metadata stamped on every event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl PlatformInfo {
    pub fn is_empty(&self) -> bool {
        self.environment.is_none() && self.region.is_none()
    }
}

/// A single buffered log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub fields: Fields,
    /// RFC 3339 UTC timestamp
    #[serde(rename = "_time")]
    pub time: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseReport>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>, fields: Fields) -> Self {
        Self {
            level,
            message: message.into(),
            fields,
            time: now_rfc3339(),
            source: String::new(),
            platform: None,
            request: None,
            response: None,
        }
    }

    /// Stamp response metadata onto a request-tagged event.
    ///
    /// Returns false (and leaves the event alone) when it carries no request.
    pub fn attach_response(&mut self, response: &ResponseReport) -> bool {
        match self.request.as_mut() {
            Some(request) => {
                request.status_code = Some(response.status_code);
                self.response = Some(response.clone());
                true
            }
            None => false,
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
