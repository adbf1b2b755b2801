//! Telemetry store
//!
//! Persists snapshots, ranked process records, the event log and
//! key/value configuration behind the `StorageBackend` trait.
//!
//! ## Backends
//!
//! - **SQLite** (default): single file, schema managed by sqlx migrations
//! - **In-Memory**: no persistence, selected with `backend = "none"`
//!
//! ## Usage
//!
//! ```no_run
//! use routerwatch::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("/tmp/routerwatch.db").await?;
//!     // Hand it to the storage actor
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::{EventQuery, HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use schema::{
    CleanupReport, ConfigEntry, EventKind, NewEvent, ProcessRecord, Snapshot, SystemEvent,
    TableCounts, TrendPoint, days_ago, hours_ago, now_seconds,
};

use tracing::warn;

use crate::config::StorageConfig;

/// Open the backend selected by the configuration
pub async fn open_backend(config: &StorageConfig) -> StorageResult<Box<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            warn!("storage backend 'none' selected, telemetry will not survive a restart");
            Ok(Box::new(memory::MemoryBackend::new()))
        }
        StorageConfig::Sqlite { path, .. } => {
            if path.as_os_str().is_empty() {
                return Err(StorageError::InvalidConfig(
                    "sqlite path must not be empty".to_string(),
                ));
            }
            Ok(Box::new(sqlite::SqliteBackend::new(path).await?))
        }
    }
}
