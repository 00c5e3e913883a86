//! Process lifecycle: state tracking, termination signals, and graceful
//! shutdown.

pub mod lifecycle;
pub mod shutdown;
pub mod signals;

pub use lifecycle::{Lifecycle, LifecycleState};
pub use shutdown::{termination_channel, ShutdownCoordinator, ShutdownReport, Termination};
