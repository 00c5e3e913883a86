//! One request/response exchange.
//!
//! ```text
//! RECEIVED -> HEADERS_SENT -> BODY_SENT -> COMPLETED
//!     \             \             \
//!      `-------------`-------------`----> FAILED
//! ```
//!
//! The identifier is issued and the start event logged in [`Exchange::begin`].
//! Exactly one terminal event follows: [`Exchange::complete`] and
//! [`Exchange::fail`] consume the exchange, and dropping an exchange that never
//! reached either logs it as failed.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use benchd_core::protocol::RequestHead;

use crate::app_state::AppState;
use crate::obs::{LogEvent, StatsSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Received,
    HeadersSent,
    BodySent,
    Completed,
    Failed,
}

impl ExchangeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExchangeState::Completed | ExchangeState::Failed)
    }
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExchangeState::Received => "RECEIVED",
            ExchangeState::HeadersSent => "HEADERS_SENT",
            ExchangeState::BodySent => "BODY_SENT",
            ExchangeState::Completed => "COMPLETED",
            ExchangeState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

pub struct Exchange {
    id: u64,
    started: Instant,
    state: ExchangeState,
    app: AppState,
}

impl Exchange {
    /// Enter RECEIVED: take the next request id and log the start event.
    pub fn begin(app: &AppState, head: &RequestHead, peer: SocketAddr) -> Self {
        let started = Instant::now();
        let id = app.stats().next_request_id();
        app.logger().write(
            LogEvent::info(format!("{} {} from {}", head.method, head.target, peer.ip()))
                .with_request(id),
        );
        Self {
            id,
            started,
            state: ExchangeState::Received,
            app: app.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Write the fixed response, advancing through HEADERS_SENT and BODY_SENT.
    /// On error the state stays at the last step that succeeded.
    pub async fn send<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let payload = self.app.payload();

        writer.write_all(payload.head()).await?;
        self.state = ExchangeState::HeadersSent;

        writer.write_all(payload.body()).await?;
        writer.flush().await?;
        self.state = ExchangeState::BodySent;

        Ok(())
    }

    /// Terminal success: log elapsed time and the current counters.
    pub fn complete(mut self) -> StatsSnapshot {
        self.state = ExchangeState::Completed;
        let snap = self.app.stats().snapshot();
        let elapsed_ms = self.started.elapsed().as_millis();
        self.app.logger().write(
            LogEvent::info(format!("COMPLETED in {elapsed_ms}ms ({snap})")).with_request(self.id),
        );
        snap
    }

    /// Terminal failure: count and log the error.
    pub fn fail(mut self, err: &io::Error) {
        self.record_failure(&err.to_string());
    }

    fn record_failure(&mut self, reason: &str) {
        tracing::debug!(id = self.id, state = %self.state, reason, "exchange failed");
        self.state = ExchangeState::Failed;
        self.app.stats().record_error();
        self.app
            .logger()
            .write(LogEvent::error(format!("ERROR: {reason}")).with_request(self.id));
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.record_failure("exchange abandoned before completion");
        }
    }
}
