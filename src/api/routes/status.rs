//! Server status endpoints

use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::api::request::ApiRequest;
use crate::api::router::{HttpMethod, RouteError, RouteTable};
use crate::api::state::ApiState;

pub fn register(table: &mut RouteTable<ApiState>) -> Result<(), RouteError> {
    table.register(HttpMethod::Get, "/api/status", status, "Server status")?;
    table.register(
        HttpMethod::Get,
        "/api/health",
        health,
        "Storage health, host uptime and load",
    )?;
    table.register(HttpMethod::Get, "/api/version", version, "API and firmware versions")?;
    Ok(())
}

/// GET /api/status
pub async fn status(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    Ok(Json(json!({
        "success": true,
        "status": "online",
        "server": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "server_uptime_seconds": (now - state.started_at).num_seconds(),
        "timestamp": now.timestamp(),
    })))
}

/// GET /api/health
///
/// Reports `degraded` instead of failing when the store is unhealthy.
pub async fn health(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let (storage_healthy, storage_message) = match state.storage.health_check().await {
        Ok(status) => (status.healthy, status.message),
        Err(e) => (false, e.to_string()),
    };

    let (uptime, load) = state
        .telemetry(|telemetry| Ok((telemetry.uptime()?, telemetry.load()?)))
        .await?;

    Ok(Json(json!({
        "success": true,
        "status": if storage_healthy { "healthy" } else { "degraded" },
        "storage": {
            "healthy": storage_healthy,
            "message": storage_message,
        },
        "uptime_seconds": uptime as u64,
        "load": load.0,
        "workers_available": state.workers.available(),
        "timestamp": Utc::now().timestamp(),
    })))
}

/// GET /api/version
pub async fn version(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let host = state.telemetry(|telemetry| telemetry.host_info()).await?;

    Ok(Json(json!({
        "success": true,
        "api_version": env!("CARGO_PKG_VERSION"),
        "openwrt_version": host.openwrt_version.unwrap_or_else(|| "unknown".to_string()),
        "kernel_version": host.kernel_version.unwrap_or_else(|| "unknown".to_string()),
    })))
}
