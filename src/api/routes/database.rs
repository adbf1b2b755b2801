//! Snapshot store endpoints

use axum::Json;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{bounded_param, numeric_segment};
use crate::api::error::{ApiError, ApiResult};
use crate::api::request::ApiRequest;
use crate::api::router::{HttpMethod, RouteError, RouteTable};
use crate::api::state::ApiState;
use crate::api::types::{
    ConfigUpdate, ConfigView, EventView, ProcessRecordView, SnapshotView, TrendPointView,
};
use crate::snapshot::assemble;
use crate::storage::{EventKind, now_seconds};
use crate::util::kb_to_mb;

const MAX_PAGE: u32 = 100;
const DEFAULT_SNAPSHOTS: u32 = 10;
const DEFAULT_EVENTS: u32 = 50;
const DEFAULT_TREND_HOURS: u32 = 24;
const MAX_TREND_HOURS: u32 = 168;

pub fn register(table: &mut RouteTable<ApiState>) -> Result<(), RouteError> {
    table.register(
        HttpMethod::Post,
        "/api/database/save/snapshot",
        save_snapshot,
        "Capture and store a system snapshot",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/database/snapshots",
        snapshots,
        "Stored snapshots, newest first (?limit=&offset=)",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/database/snapshots/*/processes",
        snapshot_processes,
        "Ranked processes of one snapshot",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/database/events",
        events,
        "Event log, newest first (?limit=&offset=&type=)",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/database/config",
        get_config,
        "Read a config entry (?key=)",
    )?;
    table.register(
        HttpMethod::Post,
        "/api/database/config",
        set_config,
        "Store a config entry",
    )?;
    table.register(
        HttpMethod::Delete,
        "/api/database/config",
        delete_config,
        "Delete a config entry (?key=)",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/database/analytics/ram-trend",
        ram_trend,
        "RAM usage over time (?hours=, max 168)",
    )?;
    table.register(
        HttpMethod::Post,
        "/api/database/cleanup",
        cleanup,
        "Delete data older than N days (?days=)",
    )?;
    table.register(
        HttpMethod::Post,
        "/api/database/vacuum",
        vacuum,
        "Compact the database file",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/database/stats",
        stats,
        "Database size and row counts",
    )?;
    Ok(())
}

/// Log an event after the main write; failure is not reported to the client
async fn record_event(
    state: &ApiState,
    kind: EventKind,
    description: String,
    data: Option<String>,
) {
    if let Err(e) = state.storage.log_event(kind.as_str(), description, data).await {
        warn!("failed to log {} event: {}", kind, e);
    }
}

/// POST /api/database/save/snapshot
pub async fn save_snapshot(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let (processes, memory, load) = state
        .telemetry(|telemetry| {
            Ok((
                telemetry.processes()?,
                telemetry.memory()?,
                telemetry.load()?,
            ))
        })
        .await?;

    let assembled = assemble(&processes, &memory, &load, now_seconds());
    let timestamp = assembled.snapshot.timestamp.timestamp();

    let snapshot_id = state.storage.save_snapshot(assembled.snapshot).await?;
    let saved = state
        .storage
        .save_process_records(snapshot_id, assembled.records)
        .await?;

    info!("saved snapshot {} with {} processes", snapshot_id, saved);
    record_event(
        &state,
        EventKind::Snapshot,
        format!("System snapshot saved with {saved} processes"),
        Some(snapshot_id.to_string()),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Snapshot saved successfully",
        "snapshot_id": snapshot_id,
        "processes_saved": saved,
        "timestamp": timestamp,
    })))
}

/// GET /api/database/snapshots
pub async fn snapshots(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let limit = bounded_param(&request, "limit", DEFAULT_SNAPSHOTS, 1, MAX_PAGE)?;
    let offset = bounded_param(&request, "offset", 0, 0, u32::MAX)?;

    let snapshots: Vec<SnapshotView> = state
        .storage
        .get_snapshots(limit, offset)
        .await?
        .into_iter()
        .map(SnapshotView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": snapshots.len(),
        "limit": limit,
        "offset": offset,
        "snapshots": snapshots,
    })))
}

/// GET /api/database/snapshots/{id}/processes
pub async fn snapshot_processes(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let snapshot_id = numeric_segment(&request, 3)?;

    let processes: Vec<ProcessRecordView> = state
        .storage
        .get_process_records(snapshot_id)
        .await?
        .into_iter()
        .map(ProcessRecordView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "snapshot_id": snapshot_id,
        "count": processes.len(),
        "processes": processes,
    })))
}

/// GET /api/database/events
pub async fn events(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let limit = bounded_param(&request, "limit", DEFAULT_EVENTS, 1, MAX_PAGE)?;
    let offset = bounded_param(&request, "offset", 0, 0, u32::MAX)?;
    let event_type = request.query_value("type").map(str::to_string);

    let events: Vec<EventView> = state
        .storage
        .get_events(limit, offset, event_type)
        .await?
        .into_iter()
        .map(EventView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": events.len(),
        "events": events,
    })))
}

fn required_key(request: &ApiRequest) -> ApiResult<String> {
    request
        .query_value("key")
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidRequest("missing 'key' parameter".to_string()))
}

/// GET /api/database/config?key=
pub async fn get_config(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let key = required_key(&request)?;
    let entry = state
        .storage
        .get_config(key.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Configuration key not found: {key}")))?;

    Ok(Json(json!({
        "success": true,
        "config": ConfigView::from(entry),
    })))
}

/// POST /api/database/config
pub async fn set_config(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let update: ConfigUpdate = request.json_body()?;
    let key = update.key.trim();
    if key.is_empty() {
        return Err(ApiError::InvalidRequest("'key' must not be empty".to_string()));
    }

    state.storage.set_config(key, update.value.as_str()).await?;
    record_event(
        &state,
        EventKind::Config,
        "Configuration updated".to_string(),
        Some(key.to_string()),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Configuration saved",
        "key": key,
    })))
}

/// DELETE /api/database/config?key=
pub async fn delete_config(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let key = required_key(&request)?;
    if !state.storage.delete_config(key.as_str()).await? {
        return Err(ApiError::NotFound(format!(
            "Configuration key not found: {key}"
        )));
    }

    record_event(
        &state,
        EventKind::Config,
        "Configuration deleted".to_string(),
        Some(key.clone()),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Configuration deleted",
        "key": key,
    })))
}

/// GET /api/database/analytics/ram-trend
pub async fn ram_trend(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let hours = bounded_param(&request, "hours", DEFAULT_TREND_HOURS, 1, MAX_TREND_HOURS)?;

    let trend: Vec<TrendPointView> = state
        .storage
        .ram_usage_trend(hours)
        .await?
        .into_iter()
        .map(TrendPointView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "hours": hours,
        "count": trend.len(),
        "trend": trend,
    })))
}

/// POST /api/database/cleanup?days=
pub async fn cleanup(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let days = bounded_param(&request, "days", state.retention_days.max(1), 1, u32::MAX)?;

    let report = state.storage.cleanup(days).await?;
    info!(
        "cleanup removed {} rows older than {} days",
        report.total(),
        days
    );
    record_event(
        &state,
        EventKind::Maintenance,
        format!("Cleaned up data older than {days} days"),
        None,
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Database cleanup completed",
        "days_kept": days,
        "deleted": report,
    })))
}

/// POST /api/database/vacuum
pub async fn vacuum(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let size_before = state.storage.database_size().await?;
    state.storage.vacuum().await?;
    let size_after = state.storage.database_size().await?;

    Ok(Json(json!({
        "success": true,
        "message": "Database vacuumed",
        "size_before_bytes": size_before,
        "size_after_bytes": size_after,
    })))
}

/// GET /api/database/stats
pub async fn stats(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let size = state.storage.database_size().await?;
    let counts = state.storage.counts_by_table().await?;
    let actor = state.storage.get_stats().await;

    Ok(Json(json!({
        "success": true,
        "database_stats": {
            "size_bytes": size,
            "size_mb": kb_to_mb(size / 1024),
            "snapshots": counts.snapshots,
            "process_records": counts.process_records,
            "events": counts.events,
            "config_entries": counts.config_entries,
        },
        "storage_actor": actor,
    })))
}
