//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! telemetry store implementations must implement.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::{
    CleanupReport, ConfigEntry, NewEvent, ProcessRecord, Snapshot, SystemEvent, TableCounts,
    TrendPoint,
};

/// Page and filter for reading the event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Maximum number of events to return
    pub limit: u32,

    /// Number of newest events to skip
    pub offset: u32,

    /// Restrict to one event type
    pub event_type: Option<String>,
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for telemetry stores
///
/// The storage actor owns exactly one backend and serializes every call,
/// so implementations never see two writes at once. They must still be
/// `Send + Sync` to live inside the actor task.
///
/// Methods take explicit cutoffs instead of reading the clock; callers
/// compute "now minus N" so backends stay deterministic under test.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert one snapshot row and return its new id
    async fn save_snapshot(&self, snapshot: Snapshot) -> StorageResult<i64>;

    /// Insert all records for a snapshot in a single transaction
    ///
    /// Each record gets `snapshot_id` regardless of the id it carries.
    /// Either every record is written or none is. Returns the number of
    /// rows written.
    async fn save_process_records(
        &self,
        snapshot_id: i64,
        records: Vec<ProcessRecord>,
    ) -> StorageResult<usize>;

    /// Newest first, ties broken by id descending
    async fn get_snapshots(&self, limit: u32, offset: u32) -> StorageResult<Vec<Snapshot>>;

    /// Records of one snapshot ordered by rank
    async fn get_process_records(&self, snapshot_id: i64) -> StorageResult<Vec<ProcessRecord>>;

    /// Append to the event log and return the new event id
    async fn append_event(&self, event: NewEvent) -> StorageResult<i64>;

    /// Newest first, ties broken by id descending
    async fn get_events(&self, query: EventQuery) -> StorageResult<Vec<SystemEvent>>;

    /// Insert or replace a config entry
    async fn set_config(&self, entry: ConfigEntry) -> StorageResult<()>;

    async fn get_config(&self, key: &str) -> StorageResult<Option<ConfigEntry>>;

    /// Returns whether a row was removed
    async fn delete_config(&self, key: &str) -> StorageResult<bool>;

    /// Delete snapshots and events strictly older than `cutoff`
    ///
    /// Process records of deleted snapshots are removed in the same
    /// transaction.
    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> StorageResult<CleanupReport>;

    /// Snapshot series at or after `since`, oldest first
    async fn ram_usage_trend(&self, since: DateTime<Utc>) -> StorageResult<Vec<TrendPoint>>;

    /// Current size of the store in bytes
    async fn database_size(&self) -> StorageResult<u64>;

    async fn counts_by_table(&self) -> StorageResult<TableCounts>;

    /// Reclaim unused space
    async fn vacuum(&self) -> StorageResult<()>;

    /// Performs a lightweight operation to verify the backend is usable
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Release resources. Later calls fail with `UnhealthyBackend`.
    async fn close(&self) -> StorageResult<()>;
}
