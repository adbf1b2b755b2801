//! Host information endpoints

use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::api::error::ApiResult;
use crate::api::request::ApiRequest;
use crate::api::router::{HttpMethod, RouteError, RouteTable};
use crate::api::state::ApiState;
use crate::collectors::procfs::format_uptime;
use crate::util::kb_to_mb;

pub fn register(table: &mut RouteTable<ApiState>) -> Result<(), RouteError> {
    table.register(HttpMethod::Get, "/api/system/info", info, "Hostname, kernel and CPU")?;
    table.register(HttpMethod::Get, "/api/system/uptime", uptime, "Time since boot")?;
    table.register(HttpMethod::Get, "/api/system/memory", memory, "Memory counters")?;
    table.register(HttpMethod::Get, "/api/system/load", load, "Load averages")?;
    table.register(HttpMethod::Get, "/api/system/datetime", datetime, "Current time")?;
    table.register(
        HttpMethod::Post,
        "/api/system/reboot",
        reboot,
        "Acknowledge a reboot request",
    )?;
    Ok(())
}

/// GET /api/system/info
pub async fn info(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let host = state.telemetry(|telemetry| telemetry.host_info()).await?;

    Ok(Json(json!({
        "success": true,
        "hostname": host.hostname,
        "kernel_version": host.kernel_version,
        "os_version": host.os_version,
        "openwrt_version": host.openwrt_version,
        "cpu_model": host.cpu_model,
        "cpu_count": host.cpu_count,
    })))
}

/// GET /api/system/uptime
pub async fn uptime(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let seconds = state.telemetry(|telemetry| telemetry.uptime()).await?;

    Ok(Json(json!({
        "success": true,
        "uptime_seconds": seconds as u64,
        "uptime_formatted": format_uptime(seconds),
    })))
}

/// GET /api/system/memory
pub async fn memory(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let memory = state.telemetry(|telemetry| telemetry.memory()).await?;

    Ok(Json(json!({
        "success": true,
        "memory": {
            "total_kb": memory.total_kb,
            "free_kb": memory.free_kb,
            "available_kb": memory.available_kb,
            "buffers_kb": memory.buffers_kb,
            "cached_kb": memory.cached_kb,
            "used_kb": memory.used_kb(),
            "total_mb": kb_to_mb(memory.total_kb),
            "used_mb": kb_to_mb(memory.used_kb()),
            "usage_percent": memory.usage_percent(),
        },
    })))
}

/// GET /api/system/load
pub async fn load(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let load = state.telemetry(|telemetry| telemetry.load()).await?;
    let averages: Vec<f64> = load
        .0
        .split_whitespace()
        .take(3)
        .map(|token| token.parse().unwrap_or(0.0))
        .collect();

    Ok(Json(json!({
        "success": true,
        "load": load.0,
        "load_1m": averages.first().copied().unwrap_or(0.0),
        "load_5m": averages.get(1).copied().unwrap_or(0.0),
        "load_15m": averages.get(2).copied().unwrap_or(0.0),
    })))
}

/// GET /api/system/datetime
pub async fn datetime(_request: ApiRequest, _state: ApiState) -> ApiResult<Json<Value>> {
    let now = Utc::now();

    Ok(Json(json!({
        "success": true,
        "timestamp": now.timestamp(),
        "datetime": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        "iso8601": now.to_rfc3339(),
        "timezone": "UTC",
    })))
}

/// POST /api/system/reboot
///
/// Never reboots the host.
pub async fn reboot(_request: ApiRequest, _state: ApiState) -> ApiResult<Json<Value>> {
    warn!("reboot requested over the API, ignoring");

    Ok(Json(json!({
        "success": true,
        "message": "Reboot request acknowledged",
        "rebooting": false,
    })))
}
