//! Server config loader (strict parsing + environment overrides).
//!
//! Resolution order: built-in defaults, then the YAML file named by
//! `BENCHD_CONFIG` (if set), then `BENCHD_PORT` / `PORT` and `BENCHD_LOG`.

pub mod schema;

use std::fs;

use benchd_core::error::{BenchError, Result};

pub use schema::{ListenSection, LogSection, ServerConfig, ShutdownSection, StatsSection};

pub const CONFIG_ENV: &str = "BENCHD_CONFIG";
pub const PORT_ENV: &str = "BENCHD_PORT";
pub const PORT_FALLBACK_ENV: &str = "PORT";
pub const LOG_ENV: &str = "BENCHD_LOG";

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| BenchError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| BenchError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load the process configuration from the environment.
pub fn load() -> Result<ServerConfig> {
    let cfg = match std::env::var(CONFIG_ENV) {
        Ok(path) => load_from_file(&path)?,
        Err(_) => ServerConfig::default(),
    };
    apply_overrides(cfg, |key| std::env::var(key).ok())
}

/// Apply environment-style overrides using `lookup` to resolve variables.
pub fn apply_overrides<F>(mut cfg: ServerConfig, lookup: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let port = lookup(PORT_ENV).or_else(|| lookup(PORT_FALLBACK_ENV));
    if let Some(raw) = port {
        cfg.server.port = raw
            .trim()
            .parse()
            .map_err(|_| BenchError::Config(format!("invalid port override: {raw:?}")))?;
    }
    if let Some(path) = lookup(LOG_ENV) {
        cfg.log.path = path.into();
    }
    cfg.validate()?;
    Ok(cfg)
}
