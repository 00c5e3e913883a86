//! Shared application state for benchd.
//!
//! One instance per process, cloned into the listener, every connection task,
//! the stats reporter, and the shutdown coordinator.

use std::sync::Arc;

use benchd_core::protocol::FixedPayload;

use crate::config::ServerConfig;
use crate::obs::{Logger, Stats};
use crate::ops::Lifecycle;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    logger: Logger,
    stats: Stats,
    payload: FixedPayload,
    lifecycle: Lifecycle,
}

impl AppState {
    pub fn new(cfg: ServerConfig, logger: Logger) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                logger,
                stats: Stats::new(),
                payload: FixedPayload::new(),
                lifecycle: Lifecycle::new(),
            }),
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub fn stats(&self) -> &Stats {
        &self.inner.stats
    }

    pub fn payload(&self) -> &FixedPayload {
        &self.inner.payload
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }
}
