//! Server lifecycle state.
//!
//! `Starting -> Running -> Draining -> Closed`. Each step only succeeds from
//! the state directly before it, so the state can never move backwards or
//! skip ahead.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecycleState {
    Starting = 0,
    Running = 1,
    Draining = 2,
    Closed = 3,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Closed,
        }
    }

    fn predecessor(self) -> Option<Self> {
        match self {
            Self::Starting => None,
            Self::Running => Some(Self::Starting),
            Self::Draining => Some(Self::Running),
            Self::Closed => Some(Self::Draining),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "STARTING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Draining => write!(f, "DRAINING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Starting as u8),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `next`. Returns `false` (and changes nothing) unless the current
    /// state is the one immediately before `next`.
    pub fn advance(&self, next: LifecycleState) -> bool {
        let Some(prev) = next.predecessor() else {
            return false;
        };
        self.state
            .compare_exchange(prev as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
