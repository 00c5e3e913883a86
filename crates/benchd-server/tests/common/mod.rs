//! Shared helpers for server integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use benchd_server::config::ServerConfig;

/// Log path inside a fresh temp dir. Keep the guard alive for the test; the
/// directory is removed when it drops.
pub fn temp_log() -> (TempDir, PathBuf) {
    let dir = tempfile::Builder::new().prefix("benchd-").tempdir().unwrap();
    let log = dir.path().join("logs").join("server.log");
    (dir, log)
}

/// Loopback config on an ephemeral port with a quiet stats timer.
pub fn test_config(log: &Path) -> ServerConfig {
    let mut cfg = ServerConfig::default();
    cfg.server.host = "127.0.0.1".into();
    cfg.server.port = 0;
    cfg.log.path = log.to_path_buf();
    cfg.stats.interval_ms = 60_000;
    cfg
}

pub fn log_lines(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read exactly one response framed by `Content-Length` (absent means empty
/// body). Bytes of any following response stay in the socket.
pub async fn read_response(stream: &mut TcpStream) -> Response {
    let mut raw = Vec::new();
    while !raw.ends_with(b"\r\n\r\n") {
        match stream.read_u8().await {
            Ok(b) => raw.push(b),
            Err(e) => panic!("connection closed before response head: {e}"),
        }
    }

    let head = String::from_utf8(raw).unwrap();
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap();
    let status: u16 = status_line.split(' ').nth(1).unwrap().parse().unwrap();
    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .map(|l| {
            let (k, v) = l.split_once(':').unwrap();
            (k.trim().to_owned(), v.trim().to_owned())
        })
        .collect();

    let len: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .map(|(_, v)| v.parse().unwrap())
        .unwrap_or(0);

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.unwrap();

    Response {
        status,
        headers,
        body,
    }
}

/// Send one GET on a fresh connection and read the response.
pub async fn get(addr: SocketAddr, path: &str) -> Response {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();
    read_response(&mut stream).await
}
