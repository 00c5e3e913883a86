//! Request and error counters.
//!
//! `Stats` is the only owner of the counters; callers get atomic increments
//! and reads, never the raw integers. `StatsReporter` writes a STATS event on a
//! fixed period until cancelled.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::app_state::AppState;
use crate::obs::logger::LogEvent;
use crate::obs::memory;

#[derive(Debug, Default)]
pub struct Stats {
    requests: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of both counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub errors: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total: {}, Errors: {}", self.requests, self.errors)
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next request identifier. Identifiers start at 1 and are
    /// never reused; the latest one issued is also the request total.
    pub fn next_request_id(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count one error. Returns the new total.
    pub fn record_error(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests(),
            errors: self.errors(),
        }
    }
}

/// Build the periodic STATS event from the current counters and memory.
pub fn stats_event(stats: &Stats) -> LogEvent {
    let snap = stats.snapshot();
    let mem = memory::sample();
    LogEvent::stats(format!(
        "STATS - Requests: {}, Errors: {}, Memory: {}MB / {}MB RSS",
        snap.requests,
        snap.errors,
        mem.data_mb(),
        mem.rss_mb()
    ))
}

/// Handle to the background STATS timer.
pub struct StatsReporter {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StatsReporter {
    /// Start emitting a STATS event every `period`. The first event is written
    /// one full period after start.
    pub fn spawn(app: AppState, period: Duration) -> Self {
        let (cancel, mut cancelled) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tick.tick() => app.logger().write(stats_event(app.stats())),
                    changed = cancelled.changed() => {
                        if changed.is_err() || *cancelled.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        Self { cancel, task }
    }

    /// Stop the timer and wait for the task to exit.
    pub async fn cancel(self) {
        let _ = self.cancel.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "stats reporter task failed");
        }
    }
}
