//! Process-level behavior of the `benchd-server` binary.

#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const BIN: &str = env!("CARGO_BIN_EXE_benchd-server");

fn spawn_server(log: &Path, port: u16) -> Child {
    Command::new(BIN)
        .env_remove("BENCHD_CONFIG")
        .env_remove("PORT")
        .env("BENCHD_PORT", port.to_string())
        .env("BENCHD_LOG", log)
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn send_sigterm(child: &Child) {
    let status = Command::new("kill")
        .arg("-TERM")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(status.success());
}

fn wait_exit(child: &mut Child, limit: Duration) -> ExitStatus {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("server did not exit");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Poll the log until the startup line names the bound port.
fn bound_port(log: &Path) -> u16 {
    for _ in 0..250 {
        if let Ok(text) = std::fs::read_to_string(log) {
            let port = text.lines().find_map(|l| {
                l.split_once("Server running on port ")
                    .and_then(|(_, p)| p.trim().parse().ok())
            });
            if let Some(port) = port {
                return port;
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server never logged its port");
}

#[tokio::test]
async fn sigterm_drains_and_exits_zero() {
    let (_dir, log) = common::temp_log();
    let mut child = spawn_server(&log, 0);
    let port = bound_port(&log);

    let resp = common::get(([127, 0, 0, 1], port).into(), "/").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body.len(), 2048);

    send_sigterm(&child);
    send_sigterm(&child);
    let status = wait_exit(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(0));

    let lines = common::log_lines(&log);
    let received = lines
        .iter()
        .filter(|l| l.ends_with("SIGTERM received, shutting down gracefully"))
        .count();
    assert_eq!(received, 1);
    assert!(lines
        .last()
        .unwrap()
        .ends_with("Server closed. Total requests: 1, Errors: 0"));
}

#[tokio::test]
async fn port_conflict_exits_one() {
    let holder = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = holder.local_addr().unwrap().port();

    let (_dir, log) = common::temp_log();
    let mut child = spawn_server(&log, port);
    let status = wait_exit(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(1));

    let lines = common::log_lines(&log);
    assert!(lines
        .iter()
        .any(|l| l.ends_with(&format!("ERROR: Port {port} is already in use"))));
    drop(holder);
}
