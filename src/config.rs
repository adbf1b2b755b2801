use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::actors::RetentionPolicy;
use crate::util;

/// Storage backend configuration
///
/// `backend` is optional in the file and defaults to `sqlite`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(from = "StorageSection")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    None,

    /// SQLite database (default)
    Sqlite {
        /// Path to the SQLite database file
        path: PathBuf,

        /// Default age limit for `/api/database/cleanup`
        retention_days: u32,

        /// Run retention on a timer as well (disabled when absent)
        cleanup_interval_hours: Option<u32>,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum BackendKind {
    None,
    #[default]
    Sqlite,
}

/// `storage` section as written in the config file
#[derive(Debug, serde::Deserialize)]
struct StorageSection {
    #[serde(default)]
    backend: BackendKind,
    #[serde(default = "crate::util::get_default_db_path")]
    path: PathBuf,
    #[serde(default = "default_retention_days")]
    retention_days: u32,
    #[serde(default)]
    cleanup_interval_hours: Option<u32>,
}

impl From<StorageSection> for StorageConfig {
    fn from(section: StorageSection) -> Self {
        match section.backend {
            BackendKind::None => StorageConfig::None,
            BackendKind::Sqlite => StorageConfig::Sqlite {
                path: section.path,
                retention_days: section.retention_days,
                cleanup_interval_hours: section.cleanup_interval_hours,
            },
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: util::get_default_db_path(),
            retention_days: default_retention_days(),
            cleanup_interval_hours: None,
        }
    }
}

impl StorageConfig {
    pub fn retention_days(&self) -> u32 {
        match self {
            StorageConfig::None => default_retention_days(),
            StorageConfig::Sqlite { retention_days, .. } => (*retention_days).max(1),
        }
    }

    /// Scheduled retention for the storage actor, if configured
    pub fn retention_policy(&self) -> Option<RetentionPolicy> {
        match self {
            StorageConfig::Sqlite {
                cleanup_interval_hours: Some(hours),
                ..
            } if *hours > 0 => Some(RetentionPolicy {
                days: self.retention_days(),
                interval: Duration::from_secs(u64::from(*hours) * 60 * 60),
            }),
            _ => None,
        }
    }

    /// Point a SQLite configuration at another file, keeping its other settings
    pub fn with_path(self, path: PathBuf) -> Self {
        match self {
            StorageConfig::Sqlite {
                retention_days,
                cleanup_interval_hours,
                ..
            } => StorageConfig::Sqlite {
                path,
                retention_days,
                cleanup_interval_hours,
            },
            StorageConfig::None => StorageConfig::Sqlite {
                path,
                retention_days: default_retention_days(),
                cleanup_interval_hours: None,
            },
        }
    }
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "crate::util::get_default_addr")]
    pub address: IpAddr,
    #[serde(default = "crate::util::get_default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: util::get_default_addr(),
            port: util::get_default_port(),
        }
    }
}

/// Limits for collaborator calls (process listing, `/proc` reads, shell)
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_max_blocking")]
    pub max_blocking: usize,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_blocking: default_max_blocking(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

fn default_max_blocking() -> usize {
    4
}

fn default_command_timeout_secs() -> u64 {
    10
}

fn default_enable_cors() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub workers: WorkerConfig,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            workers: WorkerConfig::default(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Config {
    /// Apply `ROUTERWATCH_*` environment variables on top of this config
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(port) = util::get_port() {
            self.server.port = port;
        }
        if let Some(address) = util::get_addr() {
            self.server.address = address;
        }
        if let Some(path) = util::get_db_path() {
            self.storage = self.storage.with_path(path);
        }
        self
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
