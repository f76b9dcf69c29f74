//! Request-scoped batching logger
//!
//! A [`Logger`] buffers [`LogEvent`]s in memory and ships them through a
//! [`LogSink`] at most once per flush interval. Derived loggers (`with`,
//! `with_request`) get their own buffer and throttle; the parent only keeps a
//! weak handle to them so `flush()` can reach everything logged under it.
//!
//! ## Example
//!
//! ```ignore
//! let logger = Logger::new(&config);
//! let orders = logger.with(fields! { "component" => "orders" });
//! orders.info("order placed", fields! { "order_id" => 42 });
//! logger.flush().await; // also flushes `orders`
//! ```

use crate::config::LoggerConfig;
use crate::event::{merge_fields, Fields, LogEvent, LogLevel, PlatformInfo, RequestReport, ResponseReport};
use crate::throttle::Throttle;
use crate::transport::{self, LogSink};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Per-logger settings that derived loggers inherit
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub level: LogLevel,
    pub auto_flush: bool,
    pub flush_interval: Duration,
    pub source: String,
    pub platform: Option<PlatformInfo>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self::from(&LoggerConfig::default())
    }
}

impl From<&LoggerConfig> for LoggerOptions {
    fn from(config: &LoggerConfig) -> Self {
        Self {
            level: config.log_level,
            auto_flush: config.auto_flush,
            flush_interval: Duration::from_millis(config.flush_interval_ms),
            source: config.source.clone(),
            platform: config.platform(),
        }
    }
}

struct Inner {
    options: LoggerOptions,
    fields: Fields,
    request: Option<RequestReport>,
    sink: Arc<dyn LogSink>,
    buffer: Mutex<Vec<LogEvent>>,
    throttle: Throttle,
    children: Mutex<Vec<Weak<Inner>>>,
}

/// Cheap, cloneable handle; clones share one buffer
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("sink", &self.inner.sink.name())
            .field("fields", &self.inner.fields)
            .field("request", &self.inner.request)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Logger {
    /// Logger delivering to whatever target `config` resolves to
    pub fn new(config: &LoggerConfig) -> Self {
        Self::with_sink(transport::sink_from_config(config), LoggerOptions::from(config))
    }

    pub fn with_sink(sink: Arc<dyn LogSink>, options: LoggerOptions) -> Self {
        Self::from_parts(sink, options, Fields::new(), None)
    }

    fn from_parts(
        sink: Arc<dyn LogSink>,
        options: LoggerOptions,
        fields: Fields,
        request: Option<RequestReport>,
    ) -> Self {
        let throttle = Throttle::new(options.flush_interval);
        Self {
            inner: Arc::new(Inner {
                options,
                fields,
                request,
                sink,
                buffer: Mutex::new(Vec::new()),
                throttle,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn debug(&self, message: impl Into<String>, fields: impl Into<Option<Fields>>) {
        self.log(LogLevel::Debug, message, fields);
    }

    pub fn info(&self, message: impl Into<String>, fields: impl Into<Option<Fields>>) {
        self.log(LogLevel::Info, message, fields);
    }

    pub fn warn(&self, message: impl Into<String>, fields: impl Into<Option<Fields>>) {
        self.log(LogLevel::Warn, message, fields);
    }

    pub fn error(&self, message: impl Into<String>, fields: impl Into<Option<Fields>>) {
        self.log(LogLevel::Error, message, fields);
    }

    /// Buffer one event and schedule a throttled flush.
    ///
    /// Events below the configured level are discarded; `Off` is never emitted.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, fields: impl Into<Option<Fields>>) {
        if level == LogLevel::Off || level < self.inner.options.level {
            return;
        }

        let fields = match fields.into() {
            Some(call_site) => merge_fields(&self.inner.fields, call_site),
            None => self.inner.fields.clone(),
        };

        let mut event = LogEvent::new(level, message, fields);
        event.source = self.inner.options.source.clone();
        event.platform = self.inner.options.platform.clone();
        event.request = self.inner.request.clone();

        lock(&self.inner.buffer).push(event);

        if self.inner.options.auto_flush {
            self.schedule_flush();
        }
    }

    /// Derive a logger whose events carry `fields` in addition to this one's
    pub fn with(&self, fields: Fields) -> Logger {
        let merged = merge_fields(&self.inner.fields, fields);
        self.derive(merged, self.inner.request.clone())
    }

    /// Derive a logger whose events carry `report` as request metadata
    pub fn with_request(&self, report: RequestReport) -> Logger {
        self.derive(self.inner.fields.clone(), Some(report))
    }

    fn derive(&self, fields: Fields, request: Option<RequestReport>) -> Logger {
        let child = Self::from_parts(
            Arc::clone(&self.inner.sink),
            self.inner.options.clone(),
            fields,
            request,
        );

        let mut children = lock(&self.inner.children);
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));

        child
    }

    /// Stamp `response` onto every buffered event that carries request metadata
    pub fn attach_response_status(&self, response: &ResponseReport) {
        let mut buffer = lock(&self.inner.buffer);
        let stamped = buffer
            .iter_mut()
            .map(|event| event.attach_response(response))
            .filter(|stamped| *stamped)
            .count();

        tracing::trace!(stamped, status = response.status_code, "Attached response status");
    }

    /// Send everything buffered now, including loggers derived from this one.
    ///
    /// A pending throttled flush for each of them is cancelled first.
    pub async fn flush(&self) {
        let mut loggers = vec![Arc::clone(&self.inner)];
        let mut index = 0;
        while index < loggers.len() {
            let children = lock(&loggers[index].children).clone();
            loggers.extend(children.iter().filter_map(Weak::upgrade));
            index += 1;
        }

        futures::future::join_all(loggers.into_iter().map(|inner| async move {
            inner.throttle.cancel();
            send_logs(&inner).await;
        }))
        .await;
    }

    /// Snapshot of the buffered events
    pub fn buffered(&self) -> Vec<LogEvent> {
        lock(&self.inner.buffer).clone()
    }

    /// Number of buffered events
    pub fn pending(&self) -> usize {
        lock(&self.inner.buffer).len()
    }

    pub fn fields(&self) -> &Fields {
        &self.inner.fields
    }

    pub fn request(&self) -> Option<&RequestReport> {
        self.inner.request.as_ref()
    }

    pub fn options(&self) -> &LoggerOptions {
        &self.inner.options
    }

    fn schedule_flush(&self) {
        let inner = Arc::clone(&self.inner);
        self.inner.throttle.call(async move {
            send_logs(&inner).await;
        });
    }
}

/// Drain the buffer and hand the batch to the sink.
///
/// The drain happens under the buffer lock, so events appended after this
/// point land in a fresh buffer for the next flush.
async fn send_logs(inner: &Inner) {
    let batch = std::mem::take(&mut *lock(&inner.buffer));
    if batch.is_empty() {
        return;
    }

    let count = batch.len();
    if let Err(e) = inner.sink.send(batch).await {
        tracing::error!(
            error = %e,
            sink = inner.sink.name(),
            count = count,
            "Failed to send log batch, dropping it"
        );
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use reqwest::StatusCode;

    /// Records every batch it receives
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<LogEvent>>>,
    }

    impl RecordingSink {
        fn batches(&self) -> Vec<Vec<LogEvent>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, events: Vec<LogEvent>) -> Result<(), TransportError> {
            self.batches.lock().unwrap().push(events);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl LogSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send(&self, _events: Vec<LogEvent>) -> Result<(), TransportError> {
            Err(TransportError::Status(StatusCode::BAD_GATEWAY))
        }
    }

    fn logger_with(sink: Arc<RecordingSink>, options: LoggerOptions) -> Logger {
        Logger::with_sink(sink, options)
    }

    fn manual_options() -> LoggerOptions {
        LoggerOptions {
            auto_flush: false,
            ..LoggerOptions::default()
        }
    }

    fn messages(batch: &[LogEvent]) -> Vec<&str> {
        batch.iter().map(|e| e.message.as_str()).collect()
    }

    #[tokio::test]
    async fn test_log_merges_default_and_call_site_fields() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink.clone(), manual_options());

        let child = logger.with(fields! { "a" => 1 });
        child.info("merged", fields! { "b" => 2 });
        logger.info("parent", None);

        let events = child.buffered();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fields, fields! { "a" => 1, "b" => 2 });

        let parent_events = logger.buffered();
        assert_eq!(parent_events.len(), 1);
        assert!(parent_events[0].fields.is_empty());
        assert!(logger.fields().is_empty());
    }

    #[tokio::test]
    async fn test_call_site_fields_override_defaults() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink, manual_options()).with(fields! { "user" => "default" });

        logger.warn("override", fields! { "user" => "alice" });
        assert_eq!(
            logger.buffered()[0].fields.get("user").and_then(|v| v.as_str()),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn test_level_threshold_discards_lower_events() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(
            sink,
            LoggerOptions {
                level: LogLevel::Warn,
                ..manual_options()
            },
        );

        logger.debug("d", None);
        logger.info("i", None);
        logger.warn("w", None);
        logger.error("e", None);
        logger.log(LogLevel::Off, "never", None);

        assert_eq!(messages(&logger.buffered()), vec!["w", "e"]);
    }

    #[tokio::test]
    async fn test_events_carry_source_and_platform() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(
            sink,
            LoggerOptions {
                source: "edge-log".to_string(),
                platform: Some(PlatformInfo {
                    environment: Some("preview".to_string()),
                    region: None,
                }),
                ..manual_options()
            },
        );

        logger.info("x", None);
        let event = &logger.buffered()[0];
        assert_eq!(event.source, "edge-log");
        assert_eq!(
            event.platform.as_ref().and_then(|p| p.environment.as_deref()),
            Some("preview")
        );
    }

    #[tokio::test]
    async fn test_flush_drains_buffer_in_call_order() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink.clone(), manual_options());

        logger.info("one", None);
        logger.info("two", None);
        logger.info("three", None);
        logger.flush().await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(messages(&batches[0]), vec!["one", "two", "three"]);
        assert_eq!(logger.pending(), 0);
    }

    #[tokio::test]
    async fn test_flush_with_empty_buffer_sends_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink.clone(), manual_options());

        logger.flush().await;
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn test_flush_reaches_derived_loggers() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink.clone(), manual_options());
        let child = logger.with(fields! { "scope" => "child" });
        let grandchild = child.with_request(RequestReport::new("GET", "/", "localhost", "http"));

        logger.info("root", None);
        child.info("child", None);
        grandchild.info("grandchild", None);
        logger.flush().await;

        let mut sent: Vec<String> = sink
            .batches()
            .into_iter()
            .flatten()
            .map(|e| e.message)
            .collect();
        sent.sort();
        assert_eq!(sent, vec!["child", "grandchild", "root"]);
        assert_eq!(child.pending() + grandchild.pending(), 0);
    }

    #[tokio::test]
    async fn test_dropped_children_are_pruned() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink, manual_options());

        for _ in 0..5 {
            let _ = logger.with(Fields::new());
        }
        let _kept = logger.with(Fields::new());

        assert_eq!(lock(&logger.inner.children).len(), 1);
    }

    #[tokio::test]
    async fn test_attach_response_status_stamps_request_events_only() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink, manual_options());
        let request_logger = logger.with_request(RequestReport::new("POST", "/orders", "shop.local", "https"));

        logger.info("untagged", None);
        request_logger.info("tagged", None);

        request_logger.attach_response_status(&ResponseReport::new(418));
        logger.attach_response_status(&ResponseReport::new(418));

        let tagged = &request_logger.buffered()[0];
        assert_eq!(tagged.request.as_ref().unwrap().status_code, Some(418));
        assert_eq!(tagged.response.as_ref().unwrap().status_code, 418);

        let untagged = &logger.buffered()[0];
        assert!(untagged.request.is_none());
        assert!(untagged.response.is_none());
    }

    #[tokio::test]
    async fn test_attach_response_status_skips_later_events() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink, manual_options())
            .with_request(RequestReport::new("GET", "/", "localhost", "http"));

        logger.info("before", None);
        logger.attach_response_status(&ResponseReport::new(200));
        logger.info("after", None);

        let events = logger.buffered();
        assert!(events[0].response.is_some());
        assert!(events[1].response.is_none());
        assert_eq!(events[1].request.as_ref().unwrap().status_code, None);
    }

    #[tokio::test]
    async fn test_transport_failure_drops_batch() {
        let logger = Logger::with_sink(Arc::new(FailingSink), manual_options());

        logger.error("lost", None);
        logger.flush().await;
        assert_eq!(logger.pending(), 0);

        logger.info("next", None);
        assert_eq!(logger.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_flush_disabled_never_schedules() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger_with(sink.clone(), manual_options());

        logger.info("manual", None);
        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        assert!(sink.batches().is_empty());
        assert_eq!(logger.pending(), 1);
    }
}
