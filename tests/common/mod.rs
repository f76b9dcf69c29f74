//! Shared test sinks
#![allow(dead_code)]

use async_trait::async_trait;
use reqlog::{LogEvent, LogSink, TransportError};
use std::sync::Mutex;
use std::time::Duration;

/// Records every batch it receives, in delivery order
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<LogEvent>>>,
    /// Virtual time each delivery takes
    pub delay: Option<Duration>,
}

impl RecordingSink {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn batches(&self) -> Vec<Vec<LogEvent>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<Vec<String>> {
        self.batches()
            .into_iter()
            .map(|batch| batch.into_iter().map(|e| e.message).collect())
            .collect()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, events: Vec<LogEvent>) -> Result<(), TransportError> {
        self.batches.lock().unwrap().push(events);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

/// Give spawned tasks a chance to run
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
