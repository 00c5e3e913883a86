//! OS signal forwarding.
//!
//! Every SIGTERM / SIGINT (Ctrl-C elsewhere) received for the lifetime of the
//! process is forwarded as a [`Termination`]. Repeats are forwarded too; the
//! coordinator decides to ignore them.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use benchd_core::error::Result;

use crate::ops::Termination;

/// Install the handlers and spawn the forwarding task. Fails only if the
/// handlers cannot be registered.
#[cfg(unix)]
pub fn spawn_forwarder(tx: mpsc::Sender<Termination>) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = sigterm.recv() => Termination::Terminate,
                Some(()) = sigint.recv() => Termination::Interrupt,
                else => break,
            };
            if tx.send(received).await.is_err() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_forwarder(tx: mpsc::Sender<Termination>) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "listen for ctrl-c failed");
                break;
            }
            if tx.send(Termination::Interrupt).await.is_err() {
                break;
            }
        }
    }))
}
