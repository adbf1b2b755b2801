//! Row types persisted by the telemetry store
//!
//! All timestamps are stored as unix seconds. Values read back are
//! therefore truncated to whole seconds.

use std::fmt;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Current time truncated to whole seconds, matching storage precision
pub fn now_seconds() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// `now_seconds()` moved back by `span`, saturating at the earliest
/// representable instant when the span is out of range
fn seconds_before_now(span: Option<TimeDelta>) -> DateTime<Utc> {
    let now = now_seconds();
    span.and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Start of the window covering the last `days`
pub fn days_ago(days: u32) -> DateTime<Utc> {
    seconds_before_now(TimeDelta::try_days(i64::from(days)))
}

/// Start of the window covering the last `hours`
pub fn hours_ago(hours: u32) -> DateTime<Utc> {
    seconds_before_now(TimeDelta::try_hours(i64::from(hours)))
}

pub(crate) fn to_unix(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp()
}

pub(crate) fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

/// Point-in-time capture of aggregate memory and process statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Assigned by the store on insert
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,

    pub total_processes: u32,

    /// Sum of resident memory over all sampled processes
    pub total_ram_kb: u64,

    /// Name of the largest process, empty when no processes were sampled
    pub top_process: String,
    pub top_process_ram_kb: u64,

    /// One-minute load average
    pub cpu_load: f64,

    pub memory_total_kb: u64,
    pub memory_free_kb: u64,
    pub memory_used_kb: u64,
    pub memory_usage_percent: f64,
}

/// One ranked process row belonging to a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    #[serde(default)]
    pub id: Option<i64>,

    /// Parent snapshot, filled in when the record is written
    #[serde(default)]
    pub snapshot_id: Option<i64>,

    pub pid: u32,
    pub process_name: String,
    pub ram_kb: u64,

    /// 1-based position in the memory ranking
    pub rank_position: u32,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

/// Well-known event types written by the service itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Startup,
    Shutdown,
    Snapshot,
    Config,
    Maintenance,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Startup => "STARTUP",
            EventKind::Shutdown => "SHUTDOWN",
            EventKind::Snapshot => "SNAPSHOT",
            EventKind::Config => "CONFIG",
            EventKind::Maintenance => "MAINTENANCE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: i64,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,

    pub event_type: String,
    pub description: String,

    /// Free-form payload, empty when absent
    pub data: String,
}

/// Event waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub description: String,
    pub data: String,
}

impl NewEvent {
    /// Build an event stamped with the current time
    pub fn now(
        event_type: impl Into<String>,
        description: impl Into<String>,
        data: Option<String>,
    ) -> Self {
        Self {
            timestamp: now_seconds(),
            event_type: event_type.into(),
            description: description.into(),
            data: data.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// One point of the RAM usage series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub ram_kb: u64,
    pub memory_usage_percent: f64,
}

/// Row counts of every table in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub snapshots: u64,
    pub process_records: u64,
    pub events: u64,
    pub config_entries: u64,
}

/// Rows removed by a retention pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub snapshots: u64,
    pub process_records: u64,
    pub events: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.snapshots + self.process_records + self.events
    }
}
