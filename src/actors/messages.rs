//! Message types for actor communication
//!
//! Every command carries a oneshot `respond_to` channel; the caller
//! awaits the reply while the actor keeps processing in arrival order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::storage::{
    CleanupReport, ConfigEntry, EventQuery, HealthStatus, NewEvent, ProcessRecord, Snapshot,
    StorageResult, SystemEvent, TableCounts, TrendPoint,
};

/// Reply channel carried by every storage command
pub type Reply<T> = oneshot::Sender<StorageResult<T>>;

/// Commands that can be sent to the StorageActor
#[derive(Debug)]
pub enum StorageCommand {
    SaveSnapshot {
        snapshot: Snapshot,
        respond_to: Reply<i64>,
    },

    SaveProcessRecords {
        snapshot_id: i64,
        records: Vec<ProcessRecord>,
        respond_to: Reply<usize>,
    },

    GetSnapshots {
        limit: u32,
        offset: u32,
        respond_to: Reply<Vec<Snapshot>>,
    },

    GetProcessRecords {
        snapshot_id: i64,
        respond_to: Reply<Vec<ProcessRecord>>,
    },

    AppendEvent {
        event: NewEvent,
        respond_to: Reply<i64>,
    },

    GetEvents {
        query: EventQuery,
        respond_to: Reply<Vec<SystemEvent>>,
    },

    SetConfig {
        entry: ConfigEntry,
        respond_to: Reply<()>,
    },

    GetConfig {
        key: String,
        respond_to: Reply<Option<ConfigEntry>>,
    },

    DeleteConfig {
        key: String,
        respond_to: Reply<bool>,
    },

    /// Remove rows strictly older than `before`
    Cleanup {
        before: DateTime<Utc>,
        respond_to: Reply<CleanupReport>,
    },

    RamUsageTrend {
        since: DateTime<Utc>,
        respond_to: Reply<Vec<TrendPoint>>,
    },

    DatabaseSize {
        respond_to: Reply<u64>,
    },

    CountsByTable {
        respond_to: Reply<TableCounts>,
    },

    Vacuum {
        respond_to: Reply<()>,
    },

    HealthCheck {
        respond_to: Reply<HealthStatus>,
    },

    /// Get actor bookkeeping
    GetStats {
        respond_to: oneshot::Sender<StorageStats>,
    },

    /// Close the backend and stop the actor
    ///
    /// Commands queued before this one are still answered.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Bookkeeping kept by the storage actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Commands answered since the actor started
    pub commands_handled: u64,

    /// Commands whose backend call returned an error
    pub failed_commands: u64,

    /// When retention last ran, on request or on schedule
    pub last_cleanup_time: Option<DateTime<Utc>>,

    /// Rows removed by retention since the actor started
    pub total_rows_deleted: u64,
}
