//! Operational logging and counters.
//!
//! - `logger`: durable, FIFO event log with selective console mirroring.
//! - `stats`: request/error counters plus the periodic STATS reporter.
//! - `memory`: process memory sampling for startup and STATS events.

pub mod logger;
pub mod memory;
pub mod stats;

pub use logger::{Category, LogEvent, Logger};
pub use memory::MemoryUsage;
pub use stats::{Stats, StatsReporter, StatsSnapshot};
