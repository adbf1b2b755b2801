//! Turns raw telemetry into a snapshot row plus ranked process records

use chrono::{DateTime, Utc};

use crate::storage::{ProcessRecord, Snapshot};
use crate::{LoadReading, MemoryReading, ProcessSample};

/// A snapshot and its records, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSnapshot {
    pub snapshot: Snapshot,
    pub records: Vec<ProcessRecord>,
}

/// Build a snapshot from a process list sorted by memory, largest first
///
/// Records keep the input order; their `rank_position` is the 1-based
/// position in `processes`. The top process is only reported when it
/// actually uses memory.
pub fn assemble(
    processes: &[ProcessSample],
    memory: &MemoryReading,
    load: &LoadReading,
    timestamp: DateTime<Utc>,
) -> AssembledSnapshot {
    let (top_process, top_process_ram_kb) = match processes.first() {
        Some(top) if top.ram_kb > 0 => (top.name.clone(), top.ram_kb),
        _ => (String::new(), 0),
    };

    let snapshot = Snapshot {
        id: None,
        timestamp,
        total_processes: u32::try_from(processes.len()).unwrap_or(u32::MAX),
        total_ram_kb: processes.iter().map(|p| p.ram_kb).sum(),
        top_process,
        top_process_ram_kb,
        cpu_load: load.one_minute(),
        memory_total_kb: memory.total_kb,
        memory_free_kb: memory.free_kb,
        memory_used_kb: memory.used_kb(),
        memory_usage_percent: memory.usage_percent(),
    };

    let records = processes
        .iter()
        .zip(1u32..)
        .map(|(process, rank)| ProcessRecord {
            id: None,
            snapshot_id: None,
            pid: process.pid,
            process_name: process.name.clone(),
            ram_kb: process.ram_kb,
            rank_position: rank,
            timestamp,
        })
        .collect();

    AssembledSnapshot { snapshot, records }
}
