//! Graceful shutdown.
//!
//! On the first termination event the coordinator runs, once:
//! 1. log the signal
//! 2. stop the listener accepting (lifecycle -> DRAINING)
//! 3. wait for open connections to finish, force-closing them if a drain
//!    deadline is configured and passes
//! 4. stop the stats timer and log final totals
//! 5. flush the event log (lifecycle -> CLOSED)
//!
//! Later events are drained and ignored, so they cannot change the totals.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app_state::AppState;
use crate::obs::{LogEvent, StatsReporter, StatsSnapshot};
use crate::ops::LifecycleState;
use crate::transport::ListenerHandle;

const TERMINATION_QUEUE: usize = 8;

/// Channel carrying [`Termination`] events to the coordinator. Events sent
/// before the server is started are kept until the coordinator runs.
pub fn termination_channel() -> (mpsc::Sender<Termination>, mpsc::Receiver<Termination>) {
    mpsc::channel(TERMINATION_QUEUE)
}

/// Abstract "termination requested" event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// SIGTERM.
    Terminate,
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// Requested in-process (tests, embedding).
    Requested,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Terminate => f.write_str("SIGTERM"),
            Termination::Interrupt => f.write_str("SIGINT"),
            Termination::Requested => f.write_str("Shutdown request"),
        }
    }
}

/// Outcome of a completed shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub trigger: Termination,
    pub totals: StatsSnapshot,
    /// Connections still open when the drain deadline passed.
    pub force_closed: usize,
}

pub struct ShutdownCoordinator {
    app: AppState,
    listener: ListenerHandle,
    accept_loop: JoinHandle<()>,
    reporter: StatsReporter,
    drain_timeout: Option<Duration>,
}

impl ShutdownCoordinator {
    pub fn new(
        app: AppState,
        listener: ListenerHandle,
        accept_loop: JoinHandle<()>,
        reporter: StatsReporter,
    ) -> Self {
        let drain_timeout = match app.cfg().shutdown.drain_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Self {
            app,
            listener,
            accept_loop,
            reporter,
            drain_timeout,
        }
    }

    /// Wait for the first termination event, then shut down. A closed channel
    /// counts as a request to shut down.
    pub async fn run(self, mut events: mpsc::Receiver<Termination>) -> ShutdownReport {
        let trigger = events.recv().await.unwrap_or(Termination::Requested);

        tokio::spawn(async move {
            while let Some(extra) = events.recv().await {
                tracing::warn!(signal = %extra, "shutdown already in progress; ignoring");
            }
        });

        self.shutdown(trigger).await
    }

    async fn shutdown(self, trigger: Termination) -> ShutdownReport {
        let Self {
            app,
            listener,
            accept_loop,
            reporter,
            drain_timeout,
        } = self;
        let logger = app.logger();
        let lifecycle = app.lifecycle();

        logger.write(LogEvent::info(format!(
            "{trigger} received, shutting down gracefully"
        )));

        lifecycle.advance(LifecycleState::Draining);
        listener.stop_accepting();
        if let Err(e) = accept_loop.await {
            tracing::warn!(error = %e, "accept loop task failed");
        }

        let force_closed = drain(&app, &listener, drain_timeout).await;

        reporter.cancel().await;
        let totals = app.stats().snapshot();
        logger.write(LogEvent::info(format!(
            "Server closed. Total requests: {}, Errors: {}",
            totals.requests, totals.errors
        )));

        if let Err(e) = logger.flush().await {
            tracing::error!(error = %e, "final log flush failed");
        }
        lifecycle.advance(LifecycleState::Closed);

        ShutdownReport {
            trigger,
            totals,
            force_closed,
        }
    }
}

/// Wait for open connections to finish. Returns how many had to be
/// force-closed.
async fn drain(app: &AppState, listener: &ListenerHandle, deadline: Option<Duration>) -> usize {
    let Some(deadline) = deadline else {
        listener.wait_idle().await;
        return 0;
    };

    if tokio::time::timeout(deadline, listener.wait_idle())
        .await
        .is_ok()
    {
        return 0;
    }

    let remaining = listener.active_connections();
    app.logger().write(LogEvent::error(format!(
        "ERROR: drain deadline exceeded, force-closing {remaining} connection(s)"
    )));
    listener.force_close();
    listener.wait_idle().await;
    remaining
}
