//! StorageActor - single writer in front of the telemetry store
//!
//! ## Architecture
//!
//! Request handlers never touch the backend directly. They hold a cloneable
//! [`StorageHandle`] and send commands over an mpsc channel; the actor owns
//! the backend and answers each command in arrival order on a oneshot
//! channel. This gives the service one writer regardless of how many
//! requests are in flight.
//!
//! ## Retention
//!
//! With a [`RetentionPolicy`] the actor also runs cleanup on a timer,
//! once at startup and then every `interval`, and records a MAINTENANCE
//! event for each pass.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use super::messages::{Reply, StorageCommand, StorageStats};
use crate::storage::{
    CleanupReport, ConfigEntry, EventKind, EventQuery, HealthStatus, NewEvent, ProcessRecord,
    Snapshot, StorageBackend, StorageError, StorageResult, SystemEvent, TableCounts, TrendPoint,
    schema::{days_ago, hours_ago, now_seconds},
};

/// Command channel capacity
const COMMAND_BUFFER: usize = 64;

/// Scheduled retention settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Rows older than this many days are removed
    pub days: u32,

    /// Time between passes
    pub interval: Duration,
}

/// Storage actor owning the backend
pub struct StorageActor {
    backend: Box<dyn StorageBackend>,

    command_rx: mpsc::Receiver<StorageCommand>,

    retention: Option<RetentionPolicy>,

    stats: StorageStats,
}

impl StorageActor {
    pub fn new(
        command_rx: mpsc::Receiver<StorageCommand>,
        backend: Box<dyn StorageBackend>,
        retention: Option<RetentionPolicy>,
    ) -> Self {
        if let Some(policy) = retention {
            debug!(
                "scheduled retention enabled: {} days every {:?}",
                policy.days, policy.interval
            );
        }

        Self {
            backend,
            command_rx,
            retention,
            stats: StorageStats::default(),
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting storage actor");

        let has_retention = self.retention.is_some();
        let period = self
            .retention
            .map(|policy| policy.interval)
            .unwrap_or(Duration::from_secs(24 * 60 * 60));
        let mut cleanup_interval = time::interval(period);
        cleanup_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut shutdown_ack: Option<oneshot::Sender<()>> = None;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(StorageCommand::Shutdown { respond_to }) => {
                            debug!("received shutdown command");
                            shutdown_ack = Some(respond_to);
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = cleanup_interval.tick(), if has_retention => {
                    self.run_scheduled_cleanup().await;
                }
            }
        }

        if let Err(e) = self.backend.close().await {
            error!("error closing backend: {}", e);
        }

        debug!(
            "storage actor stopped after {} commands",
            self.stats.commands_handled
        );

        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    fn reply<T>(&mut self, respond_to: Reply<T>, result: StorageResult<T>) {
        self.stats.commands_handled += 1;
        if let Err(e) = &result {
            self.stats.failed_commands += 1;
            warn!("storage command failed: {}", e);
        }
        let _ = respond_to.send(result);
    }

    fn record_cleanup(&mut self, report: &CleanupReport) {
        self.stats.last_cleanup_time = Some(Utc::now());
        self.stats.total_rows_deleted += report.total();
    }

    async fn run_scheduled_cleanup(&mut self) {
        let Some(policy) = self.retention else {
            return;
        };

        let cutoff = days_ago(policy.days);
        match self.backend.cleanup_before(cutoff).await {
            Ok(report) => {
                self.record_cleanup(&report);
                info!(
                    "scheduled retention removed {} rows older than {} days",
                    report.total(),
                    policy.days
                );
                let event = NewEvent::now(
                    EventKind::Maintenance.as_str(),
                    format!("Cleaned up data older than {} days", policy.days),
                    None,
                );
                if let Err(e) = self.backend.append_event(event).await {
                    warn!("failed to record maintenance event: {}", e);
                }
            }
            Err(e) => error!("scheduled retention failed: {}", e),
        }
    }

    async fn handle_command(&mut self, cmd: StorageCommand) {
        match cmd {
            StorageCommand::SaveSnapshot {
                snapshot,
                respond_to,
            } => {
                let result = self.backend.save_snapshot(snapshot).await;
                self.reply(respond_to, result);
            }

            StorageCommand::SaveProcessRecords {
                snapshot_id,
                records,
                respond_to,
            } => {
                let result = self.backend.save_process_records(snapshot_id, records).await;
                self.reply(respond_to, result);
            }

            StorageCommand::GetSnapshots {
                limit,
                offset,
                respond_to,
            } => {
                let result = self.backend.get_snapshots(limit, offset).await;
                self.reply(respond_to, result);
            }

            StorageCommand::GetProcessRecords {
                snapshot_id,
                respond_to,
            } => {
                let result = self.backend.get_process_records(snapshot_id).await;
                self.reply(respond_to, result);
            }

            StorageCommand::AppendEvent { event, respond_to } => {
                let result = self.backend.append_event(event).await;
                self.reply(respond_to, result);
            }

            StorageCommand::GetEvents { query, respond_to } => {
                let result = self.backend.get_events(query).await;
                self.reply(respond_to, result);
            }

            StorageCommand::SetConfig { entry, respond_to } => {
                let result = self.backend.set_config(entry).await;
                self.reply(respond_to, result);
            }

            StorageCommand::GetConfig { key, respond_to } => {
                let result = self.backend.get_config(&key).await;
                self.reply(respond_to, result);
            }

            StorageCommand::DeleteConfig { key, respond_to } => {
                let result = self.backend.delete_config(&key).await;
                self.reply(respond_to, result);
            }

            StorageCommand::Cleanup { before, respond_to } => {
                let result = self.backend.cleanup_before(before).await;
                if let Ok(report) = &result {
                    self.record_cleanup(report);
                }
                self.reply(respond_to, result);
            }

            StorageCommand::RamUsageTrend { since, respond_to } => {
                let result = self.backend.ram_usage_trend(since).await;
                self.reply(respond_to, result);
            }

            StorageCommand::DatabaseSize { respond_to } => {
                let result = self.backend.database_size().await;
                self.reply(respond_to, result);
            }

            StorageCommand::CountsByTable { respond_to } => {
                let result = self.backend.counts_by_table().await;
                self.reply(respond_to, result);
            }

            StorageCommand::Vacuum { respond_to } => {
                let result = self.backend.vacuum().await;
                self.reply(respond_to, result);
            }

            StorageCommand::HealthCheck { respond_to } => {
                let result = self.backend.health_check().await;
                self.reply(respond_to, result);
            }

            StorageCommand::GetStats { respond_to } => {
                let _ = respond_to.send(self.stats.clone());
            }

            StorageCommand::Shutdown { respond_to } => {
                // Handled by the run loop
                let _ = respond_to.send(());
            }
        }
    }
}

/// Handle for talking to the StorageActor
///
/// Cheap to clone; every clone feeds the same actor.
#[derive(Clone)]
pub struct StorageHandle {
    sender: mpsc::Sender<StorageCommand>,
}

impl StorageHandle {
    /// Spawn a storage actor without scheduled retention
    pub fn spawn(backend: Box<dyn StorageBackend>) -> Self {
        Self::spawn_with_retention(backend, None)
    }

    pub fn spawn_with_retention(
        backend: Box<dyn StorageBackend>,
        retention: Option<RetentionPolicy>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

        let actor = StorageActor::new(cmd_rx, backend, retention);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> StorageCommand,
    ) -> StorageResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(build(tx)).await.map_err(|_| {
            StorageError::UnhealthyBackend("storage actor is not running".to_string())
        })?;

        rx.await.map_err(|_| {
            StorageError::UnhealthyBackend("storage actor dropped the request".to_string())
        })?
    }

    pub async fn save_snapshot(&self, snapshot: Snapshot) -> StorageResult<i64> {
        self.request(|respond_to| StorageCommand::SaveSnapshot {
            snapshot,
            respond_to,
        })
        .await
    }

    /// Write all records of a snapshot, or none of them
    pub async fn save_process_records(
        &self,
        snapshot_id: i64,
        records: Vec<ProcessRecord>,
    ) -> StorageResult<usize> {
        self.request(|respond_to| StorageCommand::SaveProcessRecords {
            snapshot_id,
            records,
            respond_to,
        })
        .await
    }

    pub async fn get_snapshots(&self, limit: u32, offset: u32) -> StorageResult<Vec<Snapshot>> {
        self.request(|respond_to| StorageCommand::GetSnapshots {
            limit,
            offset,
            respond_to,
        })
        .await
    }

    pub async fn get_process_records(&self, snapshot_id: i64) -> StorageResult<Vec<ProcessRecord>> {
        self.request(|respond_to| StorageCommand::GetProcessRecords {
            snapshot_id,
            respond_to,
        })
        .await
    }

    /// Append an event stamped with the current time
    pub async fn log_event(
        &self,
        event_type: impl Into<String>,
        description: impl Into<String>,
        data: Option<String>,
    ) -> StorageResult<i64> {
        let event = NewEvent::now(event_type, description, data);
        self.request(|respond_to| StorageCommand::AppendEvent { event, respond_to })
            .await
    }

    pub async fn get_events(
        &self,
        limit: u32,
        offset: u32,
        event_type: Option<String>,
    ) -> StorageResult<Vec<SystemEvent>> {
        let query = EventQuery {
            limit,
            offset,
            event_type,
        };
        self.request(|respond_to| StorageCommand::GetEvents { query, respond_to })
            .await
    }

    pub async fn set_config(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> StorageResult<()> {
        let entry = ConfigEntry {
            key: key.into(),
            value: value.into(),
            updated_at: now_seconds(),
        };
        self.request(|respond_to| StorageCommand::SetConfig { entry, respond_to })
            .await
    }

    pub async fn get_config(&self, key: impl Into<String>) -> StorageResult<Option<ConfigEntry>> {
        let key = key.into();
        self.request(|respond_to| StorageCommand::GetConfig { key, respond_to })
            .await
    }

    pub async fn delete_config(&self, key: impl Into<String>) -> StorageResult<bool> {
        let key = key.into();
        self.request(|respond_to| StorageCommand::DeleteConfig { key, respond_to })
            .await
    }

    /// Remove snapshots, their process records and events older than `days`
    pub async fn cleanup(&self, days: u32) -> StorageResult<CleanupReport> {
        let before = days_ago(days);
        self.request(|respond_to| StorageCommand::Cleanup { before, respond_to })
            .await
    }

    /// Snapshot series covering the last `hours`, oldest first
    pub async fn ram_usage_trend(&self, hours: u32) -> StorageResult<Vec<TrendPoint>> {
        let since = hours_ago(hours);
        self.request(|respond_to| StorageCommand::RamUsageTrend { since, respond_to })
            .await
    }

    pub async fn database_size(&self) -> StorageResult<u64> {
        self.request(|respond_to| StorageCommand::DatabaseSize { respond_to })
            .await
    }

    pub async fn counts_by_table(&self) -> StorageResult<TableCounts> {
        self.request(|respond_to| StorageCommand::CountsByTable { respond_to })
            .await
    }

    pub async fn vacuum(&self) -> StorageResult<()> {
        self.request(|respond_to| StorageCommand::Vacuum { respond_to })
            .await
    }

    pub async fn health_check(&self) -> StorageResult<HealthStatus> {
        self.request(|respond_to| StorageCommand::HealthCheck { respond_to })
            .await
    }

    /// Get actor bookkeeping, `None` once the actor is gone
    pub async fn get_stats(&self) -> Option<StorageStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::GetStats { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }

    /// Stop the actor and wait until the backend is closed
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(StorageCommand::Shutdown { respond_to: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}
