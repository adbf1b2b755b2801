//! Host telemetry and shell collaborators
//!
//! Everything here is blocking I/O. The API layer runs these calls on the
//! bounded blocking pool, never on the async workers directly.

pub mod host;
pub mod procfs;
pub mod shell;

pub use host::HostTelemetry;
pub use shell::ShellRunner;

use crate::{HostInfo, LoadReading, MemoryReading, ProcessSample};

/// Upper bound on processes reported per listing
pub const MAX_PROCESSES: usize = 1000;

/// Source of host telemetry
pub trait TelemetrySource: Send + Sync {
    /// Running processes sorted by resident memory, largest first
    fn processes(&self) -> anyhow::Result<Vec<ProcessSample>>;

    fn memory(&self) -> anyhow::Result<MemoryReading>;

    fn load(&self) -> anyhow::Result<LoadReading>;

    /// Seconds since boot
    fn uptime(&self) -> anyhow::Result<f64>;

    fn host_info(&self) -> anyhow::Result<HostInfo>;

    /// Contents of the DHCP lease file, `None` when there is no such file
    fn dhcp_leases(&self) -> anyhow::Result<Option<String>>;
}

/// Runs a shell command line and returns its trimmed standard output
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> anyhow::Result<String>;
}

/// Sort by memory descending, then pid ascending, and cap the list
pub fn rank_by_memory(mut processes: Vec<ProcessSample>) -> Vec<ProcessSample> {
    processes.sort_by(|a, b| b.ram_kb.cmp(&a.ram_kb).then(a.pid.cmp(&b.pid)));
    processes.truncate(MAX_PROCESSES);
    processes
}
