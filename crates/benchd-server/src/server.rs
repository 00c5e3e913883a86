//! Server wiring.
//!
//! `Server::start` opens the event log, binds the listener, and starts the
//! background tasks; the returned [`RunningServer`] is driven to completion by
//! [`RunningServer::wait`], which blocks until a [`Termination`] arrives and
//! the shutdown sequence finishes.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;

use benchd_core::error::Result;

use crate::app_state::AppState;
use crate::config::ServerConfig;
use crate::obs::{Logger, Stats, StatsReporter};
use crate::ops::{termination_channel, ShutdownCoordinator, ShutdownReport, Termination};
use crate::transport::{Listener, ListenerHandle};

pub struct Server;

impl Server {
    pub async fn start(cfg: ServerConfig) -> Result<RunningServer> {
        let (tx, rx) = termination_channel();
        Self::start_with(cfg, tx, rx).await
    }

    /// Start with a termination channel created beforehand, so that events
    /// sent while the server is still starting are not lost.
    pub async fn start_with(
        cfg: ServerConfig,
        tx: mpsc::Sender<Termination>,
        rx: mpsc::Receiver<Termination>,
    ) -> Result<RunningServer> {
        let logger = Logger::open(&cfg.log.path).await?;
        let stats_period = Duration::from_millis(cfg.stats.interval_ms);
        let app = AppState::new(cfg, logger);

        let listener = match Listener::start(app.clone()).await {
            Ok(l) => l,
            Err(e) => {
                if let Err(flush_err) = app.logger().flush().await {
                    tracing::error!(error = %flush_err, "log flush failed");
                }
                return Err(e);
            }
        };
        let local_addr = listener.local_addr();
        let handle = listener.handle();

        let accept_loop = tokio::spawn(listener.serve());
        let reporter = StatsReporter::spawn(app.clone(), stats_period);
        let coordinator =
            ShutdownCoordinator::new(app.clone(), handle.clone(), accept_loop, reporter);

        Ok(RunningServer {
            app,
            local_addr,
            handle,
            coordinator,
            tx,
            rx,
        })
    }
}

pub struct RunningServer {
    app: AppState,
    local_addr: SocketAddr,
    handle: ListenerHandle,
    coordinator: ShutdownCoordinator,
    tx: mpsc::Sender<Termination>,
    rx: mpsc::Receiver<Termination>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &Stats {
        self.app.stats()
    }

    pub fn app(&self) -> &AppState {
        &self.app
    }

    pub fn listener(&self) -> &ListenerHandle {
        &self.handle
    }

    /// Sender for termination events. Signal forwarding and tests both use it.
    pub fn terminator(&self) -> mpsc::Sender<Termination> {
        self.tx.clone()
    }

    /// Run until a termination event arrives and shutdown completes.
    pub async fn wait(self) -> ShutdownReport {
        let RunningServer {
            coordinator, tx, rx, ..
        } = self;
        let report = coordinator.run(rx).await;
        drop(tx);
        report
    }
}
