//! Telemetry read from the local machine
//!
//! `/proc` text files are preferred since they are what the router
//! firmware exposes; `sysinfo` fills in when a file is missing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sysinfo::{CpuRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tracing::{debug, trace};

use super::procfs::{parse_meminfo, parse_release_description, parse_uptime};
use super::{TelemetrySource, rank_by_memory};
use crate::{HostInfo, LoadReading, MemoryReading, ProcessSample};

#[derive(Debug, Clone)]
pub struct HostTelemetry {
    proc_dir: PathBuf,
    etc_dir: PathBuf,
    leases_path: PathBuf,
}

impl Default for HostTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostTelemetry {
    pub fn new() -> Self {
        Self::with_paths("/proc", "/etc", "/tmp/dhcp.leases")
    }

    /// Read files below other roots (used by tests)
    pub fn with_paths(
        proc_dir: impl Into<PathBuf>,
        etc_dir: impl Into<PathBuf>,
        leases_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            proc_dir: proc_dir.into(),
            etc_dir: etc_dir.into(),
            leases_path: leases_path.into(),
        }
    }

    fn read(path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                trace!("could not read {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl TelemetrySource for HostTelemetry {
    fn processes(&self) -> anyhow::Result<Vec<ProcessSample>> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );

        let samples = system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter_map(|(pid, process)| {
                let name = process.name().to_string_lossy().trim().to_string();
                let ram_kb = process.memory() / 1024;
                (!name.is_empty() && ram_kb > 0).then(|| ProcessSample {
                    pid: pid.as_u32(),
                    name,
                    ram_kb,
                })
            })
            .collect();

        let ranked = rank_by_memory(samples);
        debug!("sampled {} processes", ranked.len());
        Ok(ranked)
    }

    fn memory(&self) -> anyhow::Result<MemoryReading> {
        if let Some(content) = Self::read(&self.proc_dir.join("meminfo")) {
            let reading = parse_meminfo(&content);
            if reading.total_kb > 0 {
                return Ok(reading);
            }
        }

        let mut system = System::new();
        system.refresh_memory();
        Ok(MemoryReading {
            total_kb: system.total_memory() / 1024,
            free_kb: system.free_memory() / 1024,
            available_kb: system.available_memory() / 1024,
            buffers_kb: 0,
            cached_kb: 0,
        })
    }

    fn load(&self) -> anyhow::Result<LoadReading> {
        if let Some(content) = Self::read(&self.proc_dir.join("loadavg")) {
            let content = content.trim();
            if !content.is_empty() {
                return Ok(LoadReading(content.to_string()));
            }
        }

        let load = System::load_average();
        Ok(LoadReading(format!(
            "{:.2} {:.2} {:.2}",
            load.one, load.five, load.fifteen
        )))
    }

    fn uptime(&self) -> anyhow::Result<f64> {
        Ok(Self::read(&self.proc_dir.join("uptime"))
            .as_deref()
            .and_then(parse_uptime)
            .unwrap_or_else(|| System::uptime() as f64))
    }

    fn host_info(&self) -> anyhow::Result<HostInfo> {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing()),
        );
        let cpus = system.cpus();

        Ok(HostInfo {
            hostname: System::host_name(),
            kernel_version: System::kernel_version(),
            os_version: System::long_os_version(),
            cpu_model: cpus
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .filter(|brand| !brand.is_empty()),
            cpu_count: cpus.len(),
            openwrt_version: Self::read(&self.etc_dir.join("openwrt_release"))
                .as_deref()
                .and_then(parse_release_description),
        })
    }

    fn dhcp_leases(&self) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(&self.leases_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
