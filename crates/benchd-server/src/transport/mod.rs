//! Transport layer (raw HTTP/1.x over TCP).
//!
//! The listener accepts sockets and tracks how many are open; each socket runs
//! a connection loop that parses request heads with `benchd_core` and hands
//! every request to an [`exchange::Exchange`].

pub mod conn;
pub mod exchange;
pub mod listener;

pub use exchange::{Exchange, ExchangeState};
pub use listener::{on_malformed_request, DrainPhase, Listener, ListenerHandle};
