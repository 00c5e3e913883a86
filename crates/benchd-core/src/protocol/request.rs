//! Request-head parsing.
//!
//! Tokenizing is delegated to `httparse`; this module adds what the server
//! needs on top of it:
//! - a hard cap on head size, applied before the head is complete
//! - strict CRLF line endings
//! - body framing (`Content-Length` / `Transfer-Encoding`) and keep-alive
//!
//! No indexing, `unwrap()`, `expect()` or `panic!()` on production paths.

use httparse::Status;

use crate::error::{BenchError, Result};

const CRLF: &[u8] = b"\r\n";
const MAX_HEADERS: usize = 64;

/// Protocol version named on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

/// How the request body (if any) is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body.
    None,
    /// Exactly this many bytes follow the head.
    Length(u64),
    /// Chunked transfer coding.
    Chunked,
}

/// Parsed request head.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: Version,
    pub framing: BodyFraming,
    /// Whether the peer expects the connection to stay open after the response.
    pub keep_alive: bool,
}

/// Outcome of one parse attempt over the buffered bytes.
#[derive(Debug)]
pub enum Parsed {
    /// More bytes are needed.
    Partial,
    /// A full head was found; `consumed` bytes (leading blank lines included)
    /// belong to it.
    Complete { head: RequestHead, consumed: usize },
}

/// Try to parse a request head from the start of `buf`.
///
/// Heads longer than `max_head` bytes are rejected even if still incomplete,
/// so a peer cannot make the server buffer without bound.
pub fn parse_head(buf: &[u8], max_head: usize) -> Result<Parsed> {
    // Tolerate stray CRLFs between pipelined requests.
    let mut start = 0;
    while buf.get(start..start + CRLF.len()) == Some(CRLF) {
        start += CRLF.len();
    }
    let rest = buf.get(start..).unwrap_or_default();

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let head_len = match req.parse(rest).map_err(from_httparse)? {
        Status::Complete(n) => n,
        Status::Partial => {
            if rest.len() > max_head {
                return Err(BenchError::HeadTooLarge { limit: max_head });
            }
            return Ok(Parsed::Partial);
        }
    };
    if head_len > max_head {
        return Err(BenchError::HeadTooLarge { limit: max_head });
    }
    if has_bare_lf(rest.get(..head_len).unwrap_or_default()) {
        return Err(BenchError::Malformed("bare LF in request head".into()));
    }

    let head = interpret(&req)?;
    Ok(Parsed::Complete {
        head,
        consumed: start + head_len,
    })
}

fn interpret(req: &httparse::Request<'_, '_>) -> Result<RequestHead> {
    let (Some(method), Some(target), Some(minor)) = (req.method, req.path, req.version) else {
        return Err(BenchError::Malformed("incomplete request line".into()));
    };
    let version = match minor {
        0 => Version::Http10,
        1 => Version::Http11,
        _ => return Err(BenchError::UnsupportedVersion),
    };
    if !target.is_ascii() {
        return Err(BenchError::Malformed("invalid request target".into()));
    }

    let mut content_length: Option<u64> = None;
    let mut transfer_encoding: Option<String> = None;
    let mut connection_close = false;
    let mut connection_keep_alive = false;

    for header in req.headers.iter() {
        let name = header.name;

        if name.eq_ignore_ascii_case("content-length") {
            let n = parse_content_length(header.value)?;
            match content_length {
                Some(prev) if prev != n => {
                    return Err(BenchError::Malformed("conflicting content-length".into()));
                }
                _ => content_length = Some(n),
            }
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            let value = ascii(header.value)?.trim();
            transfer_encoding = Some(match transfer_encoding {
                Some(prev) => format!("{prev}, {value}"),
                None => value.to_string(),
            });
        } else if name.eq_ignore_ascii_case("connection") {
            for token in ascii(header.value)?.split(',') {
                let token = token.trim();
                if token.eq_ignore_ascii_case("close") {
                    connection_close = true;
                } else if token.eq_ignore_ascii_case("keep-alive") {
                    connection_keep_alive = true;
                }
            }
        }
    }

    let framing = match (transfer_encoding, content_length) {
        (Some(_), Some(_)) => {
            return Err(BenchError::Malformed(
                "both transfer-encoding and content-length present".into(),
            ));
        }
        (Some(te), None) => {
            let last = te.rsplit(',').next().unwrap_or_default().trim();
            if !last.eq_ignore_ascii_case("chunked") {
                return Err(BenchError::Malformed(format!(
                    "unsupported transfer-encoding: {te}"
                )));
            }
            BodyFraming::Chunked
        }
        (None, Some(0)) | (None, None) => BodyFraming::None,
        (None, Some(n)) => BodyFraming::Length(n),
    };

    let keep_alive = if connection_close {
        false
    } else {
        match version {
            Version::Http11 => true,
            Version::Http10 => connection_keep_alive,
        }
    };

    Ok(RequestHead {
        method: method.to_string(),
        target: target.to_string(),
        version,
        framing,
        keep_alive,
    })
}

fn from_httparse(err: httparse::Error) -> BenchError {
    match err {
        httparse::Error::Version => BenchError::UnsupportedVersion,
        other => BenchError::Malformed(other.to_string()),
    }
}

fn parse_content_length(value: &[u8]) -> Result<u64> {
    let value = ascii(value)?.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BenchError::Malformed("invalid content-length".into()));
    }
    value
        .parse()
        .map_err(|_| BenchError::Malformed("content-length out of range".into()))
}

/// `httparse` accepts a lone `\n` as a line ending; the server does not.
fn has_bare_lf(head: &[u8]) -> bool {
    let mut prev = None;
    head.iter().any(|b| {
        let bare = *b == b'\n' && prev != Some(b'\r');
        prev = Some(*b);
        bare
    })
}

fn ascii(v: &[u8]) -> Result<&str> {
    std::str::from_utf8(v)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or_else(|| BenchError::Malformed("non-ascii bytes in request head".into()))
}
