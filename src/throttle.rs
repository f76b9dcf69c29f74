//! Trailing-edge throttle
//!
//! The first call in an idle window schedules one execution `interval` later;
//! calls arriving while that execution is pending are folded into it. The
//! pending slot is released just before the action runs, so a call made while
//! the action is in flight opens the next window instead of being dropped.
//! [`Throttle::cancel`] only ever stops an execution that has not started.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Default)]
struct State {
    generation: u64,
    pending: Option<(u64, JoinHandle<()>)>,
}

/// At most one execution per window, never losing the trailing call
#[derive(Clone)]
pub struct Throttle {
    interval: Duration,
    state: Arc<Mutex<State>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedule `action` for the end of the current window.
    ///
    /// Returns false when the call was coalesced into an already pending
    /// execution (the new `action` is dropped unpolled), or when there is no
    /// tokio runtime to run the timer on.
    pub fn call<F>(&self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!("No tokio runtime, throttled call skipped");
                return false;
            }
        };

        let mut state = lock(&self.state);
        if state.pending.is_some() {
            return false;
        }

        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let deadline = tokio::time::Instant::now() + self.interval;
        let shared = Arc::clone(&self.state);

        let handle = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut state = lock(&shared);
                // A cancelled execution never starts; once released it can no longer be aborted.
                if !matches!(state.pending, Some((g, _)) if g == generation) {
                    return;
                }
                state.pending = None;
            }
            action.await;
        });

        state.pending = Some((generation, handle));
        true
    }

    /// Drop the pending execution, if any
    pub fn cancel(&self) {
        if let Some((_, handle)) = lock(&self.state).pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }
}

fn lock(state: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
    // State stays consistent even if a holder panicked; nothing is left half-written.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
