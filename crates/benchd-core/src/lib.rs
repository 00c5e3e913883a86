//! benchd core: transport-agnostic HTTP/1.x primitives and the shared error type.
//!
//! This crate owns the wire-level contract of the benchmark server: how a request
//! head is recognised and how the fixed responses are laid out. It carries no
//! runtime dependencies so the parser can be exercised without sockets.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed input is
//! reported as `BenchError` so a hostile peer cannot crash the server.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{BenchError, ErrorClass, Result};
