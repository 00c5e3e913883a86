//! benchd server binary.
//!
//! - Config: defaults, optional YAML via `BENCHD_CONFIG`, env overrides
//! - Exit 0 after graceful shutdown, 1 when startup fails

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use benchd_server::ops::{self, signals};
use benchd_server::{config, Server};

const EXIT_FATAL: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "config load failed");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    // Signals are live before the listener binds; an early SIGTERM waits in
    // the channel and shuts the server down as soon as it is up.
    let (tx, rx) = ops::termination_channel();
    if let Err(e) = signals::spawn_forwarder(tx.clone()) {
        tracing::error!(error = %e, "install signal handlers failed");
        return ExitCode::from(EXIT_FATAL);
    }

    let server = match Server::start_with(cfg, tx, rx).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(class = e.class().as_str(), error = %e, "startup failed");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let report = server.wait().await;
    tracing::debug!(
        trigger = %report.trigger,
        requests = report.totals.requests,
        errors = report.totals.errors,
        force_closed = report.force_closed,
        "shutdown complete"
    );
    ExitCode::SUCCESS
}
