//! TCP listener and connection accounting.
//!
//! `Listener::start` binds and announces the server; `serve` runs the accept
//! loop until the handle leaves `DrainPhase::Serving`. Every accepted socket
//! holds a `ConnectionGuard` so the shutdown path can wait for the count of
//! open connections to reach zero.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;

use benchd_core::error::{BenchError, Result};
use benchd_core::protocol::BAD_REQUEST;

use crate::app_state::AppState;
use crate::obs::{memory, LogEvent};
use crate::ops::LifecycleState;
use crate::transport::conn;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// What open connections should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPhase {
    /// Accept new sockets, keep serving keep-alive peers.
    Serving,
    /// No new sockets; idle connections close, in-flight requests finish.
    Draining,
    /// Close everything now.
    ForceClose,
}

#[derive(Clone)]
pub struct ListenerHandle {
    phase: Arc<watch::Sender<DrainPhase>>,
    active: Arc<watch::Sender<usize>>,
}

impl ListenerHandle {
    fn new() -> Self {
        Self {
            phase: Arc::new(watch::channel(DrainPhase::Serving).0),
            active: Arc::new(watch::channel(0).0),
        }
    }

    /// Stop accepting new connections. Accepted ones keep being served.
    pub fn stop_accepting(&self) {
        self.phase.send_if_modified(|p| {
            if *p == DrainPhase::Serving {
                *p = DrainPhase::Draining;
                true
            } else {
                false
            }
        });
    }

    /// Tell every open connection to close immediately.
    pub fn force_close(&self) {
        self.phase.send_replace(DrainPhase::ForceClose);
    }

    pub fn phase(&self) -> DrainPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DrainPhase> {
        self.phase.subscribe()
    }

    pub fn active_connections(&self) -> usize {
        *self.active.borrow()
    }

    /// Resolve once no accepted connection is still open.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        loop {
            if *rx.borrow_and_update() == 0 {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn track(&self) -> ConnectionGuard {
        self.active.send_modify(|n| *n += 1);
        ConnectionGuard {
            active: Arc::clone(&self.active),
        }
    }
}

struct ConnectionGuard {
    active: Arc<watch::Sender<usize>>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub struct Listener {
    tcp: TcpListener,
    app: AppState,
    handle: ListenerHandle,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind the configured address. On success the lifecycle moves to
    /// RUNNING and the startup events are logged; on failure the error is
    /// logged and returned for the caller to exit on.
    pub async fn start(app: AppState) -> Result<Self> {
        let addr = app.cfg().listen_addr();
        let port = app.cfg().server.port;

        let bound = TcpListener::bind(&addr)
            .await
            .and_then(|tcp| tcp.local_addr().map(|local| (tcp, local)));
        let (tcp, local_addr) = match bound {
            Ok(ok) => ok,
            Err(source) => {
                let err = BenchError::Bind { addr, source };
                let logger = app.logger();
                logger.write(LogEvent::error(format!("SERVER ERROR: {err}")));
                if err.is_addr_in_use() {
                    logger.write(LogEvent::error(format!(
                        "ERROR: Port {port} is already in use"
                    )));
                }
                return Err(err);
            }
        };

        app.lifecycle().advance(LifecycleState::Running);

        let logger = app.logger();
        logger.write(LogEvent::info(format!(
            "Server running on port {}",
            local_addr.port()
        )));
        logger.write(LogEvent::info(format!(
            "Process: PID={}, Memory={}MB",
            std::process::id(),
            memory::sample().data_mb()
        )));
        logger.write(LogEvent::info(format!(
            "Logging to: {}",
            logger.path().display()
        )));

        Ok(Self {
            tcp,
            app,
            handle: ListenerHandle::new(),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    /// Accept loop. Returns (dropping the socket) once accepting is stopped.
    pub async fn serve(self) {
        let mut phase = self.handle.subscribe();

        loop {
            if *phase.borrow_and_update() != DrainPhase::Serving {
                break;
            }

            tokio::select! {
                accepted = self.tcp.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let guard = self.handle.track();
                        let app = self.app.clone();
                        let phase = self.handle.subscribe();
                        tokio::spawn(async move {
                            conn::serve_connection(stream, peer, app, phase).await;
                            drop(guard);
                        });
                    }
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning.
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                changed = phase.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(addr = %self.local_addr, "listener stopped accepting");
    }
}

/// Handle a request that could not be parsed: count it, log it, answer 400,
/// and close. No request identifier is consumed.
pub async fn on_malformed_request<W>(app: &AppState, writer: &mut W, err: &BenchError)
where
    W: AsyncWrite + Unpin,
{
    app.stats().record_error();
    app.logger()
        .write(LogEvent::error(format!("CLIENT ERROR: {err}")));

    if let Err(e) = writer.write_all(BAD_REQUEST).await {
        tracing::debug!(error = %e, "write 400 failed");
    }
    let _ = writer.shutdown().await;
}
