//! Top-level facade crate for benchd.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use benchd_core::*;
}

pub mod server {
    pub use benchd_server::*;
}
