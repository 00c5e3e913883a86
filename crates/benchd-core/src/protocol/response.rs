//! Fixed responses.
//!
//! Every successful exchange answers with the same head and the same zeroed
//! body. Both are encoded once and shared through `Bytes`, so cloning a
//! `FixedPayload` is a reference-count bump and never copies or mutates.

use bytes::Bytes;

/// Size of the response body in bytes.
pub const PAYLOAD_LEN: usize = 2048;

/// Response written on a raw connection whose request could not be parsed.
pub const BAD_REQUEST: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Pre-encoded `200 OK` head plus the zeroed body.
#[derive(Debug, Clone)]
pub struct FixedPayload {
    head: Bytes,
    body: Bytes,
}

impl FixedPayload {
    pub fn new() -> Self {
        let head = format!(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: application/octet-stream\r\n\
             Content-Length: {PAYLOAD_LEN}\r\n\
             Connection: keep-alive\r\n\
             \r\n"
        );
        Self {
            head: Bytes::from(head),
            body: Bytes::from(vec![0u8; PAYLOAD_LEN]),
        }
    }

    /// Status line and headers, terminated by the blank line.
    pub fn head(&self) -> &Bytes {
        &self.head
    }

    /// The zeroed body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl Default for FixedPayload {
    fn default() -> Self {
        Self::new()
    }
}
