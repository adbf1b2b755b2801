//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: a single file next to the service, no database server
//! - **WAL mode**: readers are not blocked while a snapshot is written
//! - **Migrations**: schema is created and versioned with sqlx on open
//!
//! Writes are serialized by the storage actor; the pool only exists so
//! reads issued by the actor do not have to reopen the file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{EventQuery, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{
    CleanupReport, ConfigEntry, NewEvent, ProcessRecord, Snapshot, SystemEvent, TableCounts,
    TrendPoint, from_unix, to_unix,
};

/// SQLite storage backend
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Open (or create) the database file and bring its schema up to date
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use routerwatch::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("/tmp/routerwatch.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("opening telemetry store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("telemetry store ready");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }
}

fn snapshot_from_row(row: &SqliteRow) -> StorageResult<Snapshot> {
    Ok(Snapshot {
        id: Some(row.try_get("id")?),
        timestamp: from_unix(row.try_get("timestamp")?),
        total_processes: row.try_get::<i64, _>("total_processes")? as u32,
        total_ram_kb: row.try_get::<i64, _>("total_ram_kb")? as u64,
        top_process: row.try_get("top_process")?,
        top_process_ram_kb: row.try_get::<i64, _>("top_process_ram_kb")? as u64,
        cpu_load: row.try_get("cpu_load")?,
        memory_total_kb: row.try_get::<i64, _>("memory_total_kb")? as u64,
        memory_free_kb: row.try_get::<i64, _>("memory_free_kb")? as u64,
        memory_used_kb: row.try_get::<i64, _>("memory_used_kb")? as u64,
        memory_usage_percent: row.try_get("memory_usage_percent")?,
    })
}

fn record_from_row(row: &SqliteRow) -> StorageResult<ProcessRecord> {
    Ok(ProcessRecord {
        id: Some(row.try_get("id")?),
        snapshot_id: Some(row.try_get("snapshot_id")?),
        pid: row.try_get::<i64, _>("pid")? as u32,
        process_name: row.try_get("process_name")?,
        ram_kb: row.try_get::<i64, _>("ram_kb")? as u64,
        rank_position: row.try_get::<i64, _>("rank_position")? as u32,
        timestamp: from_unix(row.try_get("timestamp")?),
    })
}

fn event_from_row(row: &SqliteRow) -> StorageResult<SystemEvent> {
    Ok(SystemEvent {
        id: row.try_get("id")?,
        timestamp: from_unix(row.try_get("timestamp")?),
        event_type: row.try_get("event_type")?,
        description: row.try_get("description")?,
        data: row.try_get("data")?,
    })
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, snapshot), fields(processes = snapshot.total_processes))]
    async fn save_snapshot(&self, snapshot: Snapshot) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO snapshots (
                timestamp, total_processes, total_ram_kb, top_process, top_process_ram_kb,
                cpu_load, memory_total_kb, memory_free_kb, memory_used_kb, memory_usage_percent
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_unix(&snapshot.timestamp))
        .bind(snapshot.total_processes as i64)
        .bind(snapshot.total_ram_kb as i64)
        .bind(&snapshot.top_process)
        .bind(snapshot.top_process_ram_kb as i64)
        .bind(snapshot.cpu_load)
        .bind(snapshot.memory_total_kb as i64)
        .bind(snapshot.memory_free_kb as i64)
        .bind(snapshot.memory_used_kb as i64)
        .bind(snapshot.memory_usage_percent)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("snapshot {} written", id);
        Ok(id)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn save_process_records(
        &self,
        snapshot_id: i64,
        records: Vec<ProcessRecord>,
    ) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO process_records (
                    snapshot_id, pid, process_name, ram_kb, rank_position, timestamp
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(snapshot_id)
            .bind(record.pid as i64)
            .bind(&record.process_name)
            .bind(record.ram_kb as i64)
            .bind(record.rank_position as i64)
            .bind(to_unix(&record.timestamp))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            "{} process records written for snapshot {}",
            records.len(),
            snapshot_id
        );
        Ok(records.len())
    }

    #[instrument(skip(self))]
    async fn get_snapshots(&self, limit: u32, offset: u32) -> StorageResult<Vec<Snapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, total_processes, total_ram_kb, top_process, top_process_ram_kb,
                   cpu_load, memory_total_kb, memory_free_kb, memory_used_kb, memory_usage_percent
            FROM snapshots
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn get_process_records(&self, snapshot_id: i64) -> StorageResult<Vec<ProcessRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, snapshot_id, pid, process_name, ram_kb, rank_position, timestamp
            FROM process_records
            WHERE snapshot_id = ?
            ORDER BY rank_position ASC, id ASC
            "#,
        )
        .bind(snapshot_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    async fn append_event(&self, event: NewEvent) -> StorageResult<i64> {
        let result = sqlx::query(
            "INSERT INTO events (timestamp, event_type, description, data) VALUES (?, ?, ?, ?)",
        )
        .bind(to_unix(&event.timestamp))
        .bind(&event.event_type)
        .bind(&event.description)
        .bind(&event.data)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    #[instrument(skip(self))]
    async fn get_events(&self, query: EventQuery) -> StorageResult<Vec<SystemEvent>> {
        let rows = match &query.event_type {
            Some(event_type) => {
                sqlx::query(
                    r#"
                    SELECT id, timestamp, event_type, description, data
                    FROM events
                    WHERE event_type = ?
                    ORDER BY timestamp DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(event_type)
                .bind(query.limit as i64)
                .bind(query.offset as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, timestamp, event_type, description, data
                    FROM events
                    ORDER BY timestamp DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(query.limit as i64)
                .bind(query.offset as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(event_from_row).collect()
    }

    #[instrument(skip(self, entry), fields(key = %entry.key))]
    async fn set_config(&self, entry: ConfigEntry) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO config (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .bind(to_unix(&entry.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_config(&self, key: &str) -> StorageResult<Option<ConfigEntry>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(ConfigEntry {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                updated_at: from_unix(row.try_get("updated_at")?),
            })
        })
        .transpose()
    }

    #[instrument(skip(self))]
    async fn delete_config(&self, key: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM config WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(cutoff = %cutoff))]
    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> StorageResult<CleanupReport> {
        let cutoff = to_unix(&cutoff);
        let mut tx = self.pool.begin().await?;

        let process_records = sqlx::query(
            "DELETE FROM process_records WHERE snapshot_id IN (SELECT id FROM snapshots WHERE timestamp < ?)",
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let snapshots = sqlx::query("DELETE FROM snapshots WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let events = sqlx::query("DELETE FROM events WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        let report = CleanupReport {
            snapshots,
            process_records,
            events,
        };
        info!(
            "retention removed {} snapshots, {} process records, {} events",
            report.snapshots, report.process_records, report.events
        );
        Ok(report)
    }

    #[instrument(skip(self), fields(since = %since))]
    async fn ram_usage_trend(&self, since: DateTime<Utc>) -> StorageResult<Vec<TrendPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, total_ram_kb, memory_usage_percent
            FROM snapshots
            WHERE timestamp >= ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(to_unix(&since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TrendPoint {
                    timestamp: from_unix(row.try_get("timestamp")?),
                    ram_kb: row.try_get::<i64, _>("total_ram_kb")? as u64,
                    memory_usage_percent: row.try_get("memory_usage_percent")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn database_size(&self) -> StorageResult<u64> {
        let size: i64 = sqlx::query_scalar(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(size.max(0) as u64)
    }

    #[instrument(skip(self))]
    async fn counts_by_table(&self) -> StorageResult<TableCounts> {
        let (snapshots, process_records, events, config_entries): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM snapshots),
                    (SELECT COUNT(*) FROM process_records),
                    (SELECT COUNT(*) FROM events),
                    (SELECT COUNT(*) FROM config)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(TableCounts {
            snapshots: snapshots as u64,
            process_records: process_records as u64,
            events: events as u64,
            config_entries: config_entries as u64,
        })
    }

    #[instrument(skip(self))]
    async fn vacuum(&self) -> StorageResult<()> {
        info!("vacuuming telemetry store");
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing telemetry store");
        self.pool.close().await;
        Ok(())
    }
}
