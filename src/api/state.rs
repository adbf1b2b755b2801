//! API shared state

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::blocking::BlockingPool;
use super::error::ApiResult;
use crate::actors::storage::StorageHandle;
use crate::collectors::{CommandRunner, TelemetrySource};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Handle to the storage actor
    pub storage: StorageHandle,

    /// Host telemetry (processes, memory, load, host facts)
    pub telemetry: Arc<dyn TelemetrySource>,

    /// Shell access for network and wireless queries
    pub commands: Arc<dyn CommandRunner>,

    /// Pool every telemetry and shell call goes through
    pub workers: BlockingPool,

    /// Default age limit for cleanup requests
    pub retention_days: u32,

    /// When this server started
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(
        storage: StorageHandle,
        telemetry: Arc<dyn TelemetrySource>,
        commands: Arc<dyn CommandRunner>,
        workers: BlockingPool,
        retention_days: u32,
    ) -> Self {
        Self {
            storage,
            telemetry,
            commands,
            workers,
            retention_days,
            started_at: Utc::now(),
        }
    }

    /// Query the telemetry source on the blocking pool
    pub async fn telemetry<T, F>(&self, query: F) -> ApiResult<T>
    where
        F: FnOnce(&dyn TelemetrySource) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let telemetry = Arc::clone(&self.telemetry);
        self.workers.run(move || query(telemetry.as_ref())).await
    }

    /// Run a shell command on the blocking pool
    pub async fn shell(&self, command: impl Into<String>) -> ApiResult<String> {
        let commands = Arc::clone(&self.commands);
        let command = command.into();
        self.workers.run(move || commands.run(&command)).await
    }
}
