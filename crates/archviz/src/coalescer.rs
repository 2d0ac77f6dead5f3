//! Debouncing of relayout requests.
//!
//! [`RelayoutCoalescer::schedule_relayout`] spawns a task on the current
//! [`tokio::task::LocalSet`] that sleeps for the configured delay and then
//! runs the relayout. Scheduling again while a task is pending aborts that
//! task first, so a burst of requests ends in a single relayout after the
//! last one.
//!
//! This is best-effort. A task whose sleep already elapsed may run before a
//! later request gets to abort it, so one burst can produce more than one
//! relayout. Callers must tolerate that.

use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Whether a relayout is waiting to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayoutState {
    /// Nothing pending.
    Idle,

    /// A relayout task is armed.
    Scheduled,
}

impl fmt::Display for RelayoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// Re-armable, cancel-on-rearm deferred relayout.
#[derive(Debug)]
pub struct RelayoutCoalescer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl RelayoutCoalescer {
    /// Create a coalescer waiting `delay` after the last request.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// The debounce delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm a relayout, cancelling any pending one.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`tokio::task::LocalSet`].
    pub fn schedule_relayout<F>(&mut self, relayout: F)
    where
        F: FnOnce() + 'static,
    {
        if let Some(previous) = self.pending.take() {
            if !previous.is_finished() {
                trace!("Re-arming pending relayout");
            }
            previous.abort();
        }

        let delay = self.delay;
        self.pending = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            relayout();
        }));
    }

    /// Current state of the pending relayout.
    pub fn state(&self) -> RelayoutState {
        match &self.pending {
            Some(handle) if !handle.is_finished() => RelayoutState::Scheduled,
            _ => RelayoutState::Idle,
        }
    }

    /// Whether a relayout is armed.
    pub fn is_pending(&self) -> bool {
        self.state() == RelayoutState::Scheduled
    }

    /// Wait until the pending relayout, if any, has run.
    pub async fn flush(&mut self) {
        if let Some(handle) = self.pending.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    warn!("Relayout task panicked");
                }
            }
        }
    }
}

impl Drop for RelayoutCoalescer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
