//! Shared error type across benchd crates.

use std::io;

use thiserror::Error;

/// Error classes used for logging and process exit decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Process-terminating (bind failure, unusable config).
    Fatal,
    /// Per-connection, caused by the peer sending an invalid request.
    Client,
    /// Per-connection, caused by the response stream failing.
    Transport,
}

impl ErrorClass {
    /// Stable string form.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Fatal => "FATAL",
            ErrorClass::Client => "CLIENT",
            ErrorClass::Transport => "TRANSPORT",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
    #[error("unsupported http version")]
    UnsupportedVersion,
    #[error("invalid config: {0}")]
    Config(String),
    #[error("listen {addr} failed: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BenchError {
    /// Map this error onto its handling class.
    pub fn class(&self) -> ErrorClass {
        match self {
            BenchError::Malformed(_)
            | BenchError::HeadTooLarge { .. }
            | BenchError::UnsupportedVersion => ErrorClass::Client,
            BenchError::Config(_) | BenchError::Bind { .. } => ErrorClass::Fatal,
            BenchError::Io(_) => ErrorClass::Transport,
        }
    }

    /// True when a bind failed because another socket already owns the address.
    pub fn is_addr_in_use(&self) -> bool {
        matches!(self, BenchError::Bind { source, .. } if source.kind() == io::ErrorKind::AddrInUse)
    }
}
