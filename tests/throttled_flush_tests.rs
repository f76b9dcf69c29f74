//! Throttled flush behavior under virtual time
mod common;

use common::{settle, RecordingSink};
use reqlog::{fields, Logger, LoggerOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::advance;

const WINDOW: Duration = Duration::from_millis(1000);

fn auto_logger(sink: Arc<RecordingSink>) -> Logger {
    Logger::with_sink(
        sink,
        LoggerOptions {
            flush_interval: WINDOW,
            auto_flush: true,
            ..LoggerOptions::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_window_then_forced_flush_scenario() {
    let sink = Arc::new(RecordingSink::default());
    let logger = auto_logger(sink.clone());

    logger.info("x", None);
    advance(Duration::from_millis(999)).await;
    settle().await;
    assert!(sink.batches().is_empty(), "no flush before the window closes");

    advance(Duration::from_millis(2)).await;
    settle().await;
    assert_eq!(sink.messages(), vec![vec!["x".to_string()]]);

    logger.info("y", None);
    logger.flush().await;
    assert_eq!(
        sink.messages(),
        vec![vec!["x".to_string()], vec!["y".to_string()]]
    );

    // The throttled flush scheduled by "y" must not resend anything
    advance(WINDOW * 3).await;
    settle().await;
    assert_eq!(sink.batches().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_calls_within_one_window_produce_one_ordered_flush() {
    // (number of events, spacing between them) pairs that all fit in one window
    let cases = [(1, 0u64), (2, 10), (7, 100), (25, 39), (100, 9)];

    for (count, spacing_ms) in cases {
        let sink = Arc::new(RecordingSink::default());
        let logger = auto_logger(sink.clone());

        for i in 0..count {
            logger.debug(format!("event-{}", i), fields! { "i" => i });
            if spacing_ms > 0 {
                advance(Duration::from_millis(spacing_ms)).await;
            }
        }
        advance(WINDOW).await;
        settle().await;

        let expected: Vec<String> = (0..count).map(|i| format!("event-{}", i)).collect();
        assert_eq!(sink.messages(), vec![expected], "case count={}", count);
    }
}

#[tokio::test(start_paused = true)]
async fn test_each_window_flushes_at_most_once() {
    let sink = Arc::new(RecordingSink::default());
    let logger = auto_logger(sink.clone());

    // 3.5 windows of steady logging, one event every 100ms
    for i in 0..35 {
        logger.info(format!("tick-{}", i), None);
        advance(Duration::from_millis(100)).await;
        settle().await;
    }
    advance(WINDOW).await;
    settle().await;

    let batches = sink.messages();
    assert_eq!(batches.len(), 4);
    let flattened: Vec<String> = batches.into_iter().flatten().collect();
    let expected: Vec<String> = (0..35).map(|i| format!("tick-{}", i)).collect();
    assert_eq!(flattened, expected, "no event lost or duplicated");
}

#[tokio::test(start_paused = true)]
async fn test_events_logged_during_in_flight_flush_start_a_new_batch() {
    let sink = Arc::new(RecordingSink::with_delay(Duration::from_millis(500)));
    let logger = auto_logger(sink.clone());

    logger.info("a", None);
    advance(Duration::from_millis(1001)).await;
    settle().await;
    assert_eq!(sink.messages(), vec![vec!["a".to_string()]]);

    // first delivery is still in flight here
    advance(Duration::from_millis(200)).await;
    logger.info("b", None);
    assert_eq!(logger.pending(), 1);

    advance(WINDOW).await;
    settle().await;
    assert_eq!(
        sink.messages(),
        vec![vec!["a".to_string()], vec!["b".to_string()]]
    );
}

#[tokio::test(start_paused = true)]
async fn test_child_logger_does_not_leak_fields_into_parent() {
    let sink = Arc::new(RecordingSink::default());
    let parent = auto_logger(sink.clone());
    let child = parent.with(fields! { "a" => 1 });

    child.info("child", fields! { "b" => 2 });
    parent.info("parent", None);

    advance(WINDOW + Duration::from_millis(1)).await;
    settle().await;

    let events: Vec<_> = sink.batches().into_iter().flatten().collect();
    assert_eq!(events.len(), 2);

    let child_event = events.iter().find(|e| e.message == "child").unwrap();
    assert_eq!(child_event.fields, fields! { "a" => 1, "b" => 2 });

    let parent_event = events.iter().find(|e| e.message == "parent").unwrap();
    assert!(parent_event.fields.is_empty());
}
