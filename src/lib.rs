pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod collectors;
pub mod config;
pub mod snapshot;
pub mod storage;
pub mod util;

use serde::{Deserialize, Serialize};

/// One running process as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub ram_kb: u64,
}

/// Memory counters in kB, as found in `/proc/meminfo`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
}

impl MemoryReading {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.free_kb)
    }

    /// Used share of total memory, 0 when total is unknown
    pub fn usage_percent(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        self.used_kb() as f64 / self.total_kb as f64 * 100.0
    }
}

/// Raw load average line, e.g. `"0.42 0.31 0.20 1/83 1234"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReading(pub String);

impl LoadReading {
    /// One-minute load, 0.0 when the text does not start with a number
    pub fn one_minute(&self) -> f64 {
        self.0
            .split_whitespace()
            .next()
            .and_then(|token| token.parse().ok())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: Option<String>,
    pub kernel_version: Option<String>,
    pub os_version: Option<String>,
    pub cpu_model: Option<String>,
    pub cpu_count: usize,
    /// `DISTRIB_DESCRIPTION` from `/etc/openwrt_release`
    pub openwrt_version: Option<String>,
}
