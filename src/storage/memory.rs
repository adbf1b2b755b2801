//! In-memory storage backend (no persistence)
//!
//! Used when the service runs with `storage.backend = "none"` and in
//! tests that do not care about the file format. It honours the same
//! ordering and retention rules as the SQLite backend.
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart
//! - **Size**: reported as the sum of stored string lengths, an estimate

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{EventQuery, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{
    CleanupReport, ConfigEntry, NewEvent, ProcessRecord, Snapshot, SystemEvent, TableCounts,
    TrendPoint,
};

#[derive(Debug, Default)]
struct MemoryState {
    snapshots: Vec<Snapshot>,
    records: Vec<ProcessRecord>,
    events: Vec<SystemEvent>,
    config: BTreeMap<String, ConfigEntry>,
    next_snapshot_id: i64,
    next_record_id: i64,
    next_event_id: i64,
    closed: bool,
}

impl MemoryState {
    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::UnhealthyBackend(
                "in-memory backend is closed".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn page<T>(items: Vec<T>, limit: u32, offset: u32) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn save_snapshot(&self, mut snapshot: Snapshot) -> StorageResult<i64> {
        let mut state = self.state.write().await;
        state.ensure_open()?;

        state.next_snapshot_id += 1;
        let id = state.next_snapshot_id;
        snapshot.id = Some(id);
        state.snapshots.push(snapshot);

        debug!("in-memory snapshot {} stored", id);
        Ok(id)
    }

    async fn save_process_records(
        &self,
        snapshot_id: i64,
        records: Vec<ProcessRecord>,
    ) -> StorageResult<usize> {
        let mut state = self.state.write().await;
        state.ensure_open()?;

        let count = records.len();
        for mut record in records {
            state.next_record_id += 1;
            record.id = Some(state.next_record_id);
            record.snapshot_id = Some(snapshot_id);
            state.records.push(record);
        }

        Ok(count)
    }

    async fn get_snapshots(&self, limit: u32, offset: u32) -> StorageResult<Vec<Snapshot>> {
        let state = self.state.read().await;
        state.ensure_open()?;

        let mut snapshots = state.snapshots.clone();
        newest_first(&mut snapshots, |s| (s.timestamp, s.id.unwrap_or_default()));
        Ok(page(snapshots, limit, offset))
    }

    async fn get_process_records(&self, snapshot_id: i64) -> StorageResult<Vec<ProcessRecord>> {
        let state = self.state.read().await;
        state.ensure_open()?;

        let mut records: Vec<ProcessRecord> = state
            .records
            .iter()
            .filter(|r| r.snapshot_id == Some(snapshot_id))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.rank_position, r.id));
        Ok(records)
    }

    async fn append_event(&self, event: NewEvent) -> StorageResult<i64> {
        let mut state = self.state.write().await;
        state.ensure_open()?;

        state.next_event_id += 1;
        let id = state.next_event_id;
        state.events.push(SystemEvent {
            id,
            timestamp: event.timestamp,
            event_type: event.event_type,
            description: event.description,
            data: event.data,
        });
        Ok(id)
    }

    async fn get_events(&self, query: EventQuery) -> StorageResult<Vec<SystemEvent>> {
        let state = self.state.read().await;
        state.ensure_open()?;

        let mut events: Vec<SystemEvent> = state
            .events
            .iter()
            .filter(|e| {
                query
                    .event_type
                    .as_deref()
                    .is_none_or(|kind| e.event_type == kind)
            })
            .cloned()
            .collect();
        newest_first(&mut events, |e| (e.timestamp, e.id));
        Ok(page(events, query.limit, query.offset))
    }

    async fn set_config(&self, entry: ConfigEntry) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.ensure_open()?;
        state.config.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn get_config(&self, key: &str) -> StorageResult<Option<ConfigEntry>> {
        let state = self.state.read().await;
        state.ensure_open()?;
        Ok(state.config.get(key).cloned())
    }

    async fn delete_config(&self, key: &str) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        state.ensure_open()?;
        Ok(state.config.remove(key).is_some())
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> StorageResult<CleanupReport> {
        let mut state = self.state.write().await;
        state.ensure_open()?;

        let expired: Vec<i64> = state
            .snapshots
            .iter()
            .filter(|s| s.timestamp < cutoff)
            .filter_map(|s| s.id)
            .collect();

        let before = (state.snapshots.len(), state.records.len(), state.events.len());
        state.snapshots.retain(|s| s.timestamp >= cutoff);
        state
            .records
            .retain(|r| r.snapshot_id.is_none_or(|id| !expired.contains(&id)));
        state.events.retain(|e| e.timestamp >= cutoff);

        Ok(CleanupReport {
            snapshots: (before.0 - state.snapshots.len()) as u64,
            process_records: (before.1 - state.records.len()) as u64,
            events: (before.2 - state.events.len()) as u64,
        })
    }

    async fn ram_usage_trend(&self, since: DateTime<Utc>) -> StorageResult<Vec<TrendPoint>> {
        let state = self.state.read().await;
        state.ensure_open()?;

        let mut snapshots: Vec<&Snapshot> = state
            .snapshots
            .iter()
            .filter(|s| s.timestamp >= since)
            .collect();
        snapshots.sort_by_key(|s| (s.timestamp, s.id));

        Ok(snapshots
            .into_iter()
            .map(|s| TrendPoint {
                timestamp: s.timestamp,
                ram_kb: s.total_ram_kb,
                memory_usage_percent: s.memory_usage_percent,
            })
            .collect())
    }

    async fn database_size(&self) -> StorageResult<u64> {
        let state = self.state.read().await;
        state.ensure_open()?;

        let snapshots: usize = state
            .snapshots
            .iter()
            .map(|s| std::mem::size_of::<Snapshot>() + s.top_process.len())
            .sum();
        let records: usize = state
            .records
            .iter()
            .map(|r| std::mem::size_of::<ProcessRecord>() + r.process_name.len())
            .sum();
        let events: usize = state
            .events
            .iter()
            .map(|e| e.event_type.len() + e.description.len() + e.data.len())
            .sum();
        let config: usize = state
            .config
            .values()
            .map(|c| c.key.len() + c.value.len())
            .sum();

        Ok((snapshots + records + events + config) as u64)
    }

    async fn counts_by_table(&self) -> StorageResult<TableCounts> {
        let state = self.state.read().await;
        state.ensure_open()?;

        Ok(TableCounts {
            snapshots: state.snapshots.len() as u64,
            process_records: state.records.len() as u64,
            events: state.events.len() as u64,
            config_entries: state.config.len() as u64,
        })
    }

    async fn vacuum(&self) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.ensure_open()?;
        state.snapshots.shrink_to_fit();
        state.records.shrink_to_fit();
        state.events.shrink_to_fit();
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let state = self.state.read().await;

        let mut metadata = HashMap::new();
        metadata.insert("backend".to_string(), "memory".to_string());

        Ok(HealthStatus {
            healthy: !state.closed,
            message: if state.closed {
                "in-memory backend closed".to_string()
            } else {
                "in-memory backend operational".to_string()
            },
            metadata,
        })
    }

    async fn close(&self) -> StorageResult<()> {
        self.state.write().await.closed = true;
        Ok(())
    }
}
