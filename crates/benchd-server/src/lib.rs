//! benchd server library entry.
//!
//! A benchmark HTTP server: every request gets the same 2048-byte zero
//! payload while lifecycle events, counters, and periodic memory snapshots go
//! to an append-only log. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod server;
pub mod transport;

pub use server::{RunningServer, Server};
