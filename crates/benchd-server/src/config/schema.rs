use std::path::PathBuf;

use serde::Deserialize;
use benchd_core::error::{BenchError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ListenSection,

    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub stats: StatsSection,

    #[serde(default)]
    pub shutdown: ShutdownSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ListenSection::default(),
            log: LogSection::default(),
            stats: StatsSection::default(),
            shutdown: ShutdownSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BenchError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.log.validate()?;
        self.stats.validate()?;

        Ok(())
    }

    /// `host:port` string handed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenSection {
    #[serde(default = "default_host")]
    pub host: String,

    /// `0` asks the OS for an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_head_bytes")]
    pub max_head_bytes: usize,
}

impl Default for ListenSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_head_bytes: default_max_head_bytes(),
        }
    }
}

impl ListenSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BenchError::Config("server.host must not be empty".into()));
        }
        if !(512..=65536).contains(&self.max_head_bytes) {
            return Err(BenchError::Config(
                "server.max_head_bytes must be between 512 and 65536".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}

impl LogSection {
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(BenchError::Config("log.path must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsSection {
    #[serde(default = "default_stats_interval_ms")]
    pub interval_ms: u64,
}

impl Default for StatsSection {
    fn default() -> Self {
        Self {
            interval_ms: default_stats_interval_ms(),
        }
    }
}

impl StatsSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(BenchError::Config(
                "stats.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutdownSection {
    /// `0` waits for in-flight connections indefinitely.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_max_head_bytes() -> usize {
    8192
}
fn default_log_path() -> PathBuf {
    PathBuf::from("server.log")
}
fn default_stats_interval_ms() -> u64 {
    10_000
}
fn default_drain_timeout_ms() -> u64 {
    30_000
}
