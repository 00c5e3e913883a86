//! Process memory sampling.
//!
//! Linux reads `/proc/self/status`. `VmData` is the data-segment size: every
//! private writable mapping, so the heap plus thread stacks and anonymous
//! maps. It is the figure reported where heap usage is asked for. `VmRSS` is
//! the resident set. Elsewhere both figures read as zero.

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// `VmData`, an upper bound on heap usage.
    pub data_bytes: u64,
    pub rss_bytes: u64,
}

impl MemoryUsage {
    /// Data-segment size (`VmData`) rounded to the nearest megabyte.
    pub fn data_mb(&self) -> u64 {
        round_mb(self.data_bytes)
    }

    /// Resident set size rounded to the nearest megabyte.
    pub fn rss_mb(&self) -> u64 {
        round_mb(self.rss_bytes)
    }
}

fn round_mb(bytes: u64) -> u64 {
    (bytes + MIB / 2) / MIB
}

/// Sample the current process.
pub fn sample() -> MemoryUsage {
    #[cfg(target_os = "linux")]
    {
        match std::fs::read_to_string("/proc/self/status") {
            Ok(s) => parse_status(&s),
            Err(e) => {
                tracing::debug!(error = %e, "read /proc/self/status failed");
                MemoryUsage::default()
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        MemoryUsage::default()
    }
}

/// Parse the `VmData` / `VmRSS` lines of a procfs status file.
pub fn parse_status(status: &str) -> MemoryUsage {
    let mut usage = MemoryUsage::default();
    for line in status.lines() {
        if let Some(v) = line.strip_prefix("VmData:") {
            usage.data_bytes = parse_kib(v).unwrap_or(0);
        } else if let Some(v) = line.strip_prefix("VmRSS:") {
            usage.rss_bytes = parse_kib(v).unwrap_or(0);
        }
    }
    usage
}

// "   123456 kB"
fn parse_kib(v: &str) -> Option<u64> {
    let mut parts = v.split_whitespace();
    let n: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => Some(n * 1024),
        Some(_) => None,
    }
}
