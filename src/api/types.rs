//! Response bodies shared by the route handlers
//!
//! Every successful body carries `"success": true`; error bodies are built
//! by `ApiError`.

use serde::{Deserialize, Serialize};

use super::router::RouteInfo;
use crate::ProcessSample;
use crate::storage::{ConfigEntry, ProcessRecord, Snapshot, SystemEvent, TrendPoint};
use crate::util::kb_to_mb;

/// Body of `/api` and `/api/help`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteListing {
    pub success: bool,
    pub api: String,
    pub version: String,
    pub count: usize,
    pub endpoints: Vec<RouteInfo>,
}

impl RouteListing {
    pub fn new(endpoints: Vec<RouteInfo>) -> Self {
        Self {
            success: true,
            api: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            count: endpoints.len(),
            endpoints,
        }
    }
}

/// Stored snapshot plus derived display fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotView {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// `YYYY-MM-DD HH:MM:SS`, UTC
    pub datetime: String,
    pub total_ram_mb: f64,
}

impl From<Snapshot> for SnapshotView {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            datetime: snapshot.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            total_ram_mb: kb_to_mb(snapshot.total_ram_kb),
            snapshot,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: SystemEvent,
    pub datetime: String,
}

impl From<SystemEvent> for EventView {
    fn from(event: SystemEvent) -> Self {
        Self {
            datetime: event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecordView {
    #[serde(flatten)]
    pub record: ProcessRecord,
    pub ram_mb: f64,
}

impl From<ProcessRecord> for ProcessRecordView {
    fn from(record: ProcessRecord) -> Self {
        Self {
            ram_mb: kb_to_mb(record.ram_kb),
            record,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPointView {
    #[serde(flatten)]
    pub point: TrendPoint,
    pub datetime: String,
    pub ram_mb: f64,
}

impl From<TrendPoint> for TrendPointView {
    fn from(point: TrendPoint) -> Self {
        Self {
            datetime: point.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            ram_mb: kb_to_mb(point.ram_kb),
            point,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigView {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
    pub datetime: String,
}

impl From<ConfigEntry> for ConfigView {
    fn from(entry: ConfigEntry) -> Self {
        Self {
            datetime: entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: entry.updated_at.timestamp(),
            key: entry.key,
            value: entry.value,
        }
    }
}

/// Live process row with its rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessView {
    pub rank: usize,
    pub pid: u32,
    pub name: String,
    pub ram_kb: u64,
    pub ram_mb: f64,
}

impl ProcessView {
    pub fn ranked(processes: &[ProcessSample]) -> Vec<Self> {
        processes
            .iter()
            .enumerate()
            .map(|(index, process)| Self {
                rank: index + 1,
                pid: process.pid,
                name: process.name.clone(),
                ram_kb: process.ram_kb,
                ram_mb: kb_to_mb(process.ram_kb),
            })
            .collect()
    }
}

/// Body of `POST /api/database/config`
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigUpdate {
    pub key: String,
    pub value: String,
}
