//! Live process and memory monitoring
//!
//! Nothing here touches the store; `/api/monitoring/system/stats` assembles
//! a snapshot in memory the same way `POST /api/database/save/snapshot` does.

use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

use super::numeric_segment;
use crate::ProcessSample;
use crate::api::error::{ApiError, ApiResult};
use crate::api::request::ApiRequest;
use crate::api::router::{HttpMethod, RouteError, RouteTable};
use crate::api::state::ApiState;
use crate::api::types::ProcessView;
use crate::snapshot::assemble;
use crate::util::kb_to_mb;

const DEFAULT_TOP: usize = 10;
const MAX_TOP: usize = 100;
const SUMMARY_TOP: usize = 5;

pub fn register(table: &mut RouteTable<ApiState>) -> Result<(), RouteError> {
    table.register(
        HttpMethod::Get,
        "/api/monitoring/processes",
        processes,
        "All processes by memory use",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/monitoring/processes/top",
        top_processes,
        "Top 10 processes by memory use",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/monitoring/processes/top/*",
        top_processes,
        "Top N processes by memory use (max 100)",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/monitoring/memory/summary",
        memory_summary,
        "Memory totals and largest processes",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/monitoring/system/stats",
        system_stats,
        "Live snapshot without saving it",
    )?;
    Ok(())
}

/// Process list from the host; an empty list means the read failed
async fn process_list(state: &ApiState) -> ApiResult<Vec<ProcessSample>> {
    let processes = state.telemetry(|telemetry| telemetry.processes()).await?;
    if processes.is_empty() {
        return Err(ApiError::Internal("Failed to get process list".to_string()));
    }
    Ok(processes)
}

/// `N` from `/processes/top/N`; non-positive falls back to the default
fn top_count(request: &ApiRequest) -> ApiResult<usize> {
    if request.segments().count() < 5 {
        return Ok(DEFAULT_TOP);
    }

    let requested = numeric_segment(request, 4)?;
    Ok(match usize::try_from(requested) {
        Ok(0) | Err(_) => DEFAULT_TOP,
        Ok(n) => n.min(MAX_TOP),
    })
}

/// GET /api/monitoring/processes
pub async fn processes(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let processes = process_list(&state).await?;
    let total_ram_kb: u64 = processes.iter().map(|p| p.ram_kb).sum();

    Ok(Json(json!({
        "success": true,
        "count": processes.len(),
        "total_ram_kb": total_ram_kb,
        "total_ram_mb": kb_to_mb(total_ram_kb),
        "processes": ProcessView::ranked(&processes),
    })))
}

/// GET /api/monitoring/processes/top and /api/monitoring/processes/top/N
pub async fn top_processes(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let limit = top_count(&request)?;
    let processes = process_list(&state).await?;
    let top = &processes[..limit.min(processes.len())];

    Ok(Json(json!({
        "success": true,
        "limit": limit,
        "count": top.len(),
        "total_processes": processes.len(),
        "processes": ProcessView::ranked(top),
    })))
}

/// GET /api/monitoring/memory/summary
pub async fn memory_summary(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let memory = state.telemetry(|telemetry| telemetry.memory()).await?;
    let processes = process_list(&state).await?;
    let process_ram_kb: u64 = processes.iter().map(|p| p.ram_kb).sum();
    let top = &processes[..SUMMARY_TOP.min(processes.len())];

    Ok(Json(json!({
        "success": true,
        "memory": {
            "total_kb": memory.total_kb,
            "free_kb": memory.free_kb,
            "used_kb": memory.used_kb(),
            "available_kb": memory.available_kb,
            "usage_percent": memory.usage_percent(),
        },
        "process_ram_kb": process_ram_kb,
        "process_ram_mb": kb_to_mb(process_ram_kb),
        "top_processes": ProcessView::ranked(top),
    })))
}

/// GET /api/monitoring/system/stats
pub async fn system_stats(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let (processes, memory, load) = state
        .telemetry(|telemetry| {
            Ok((
                telemetry.processes()?,
                telemetry.memory()?,
                telemetry.load()?,
            ))
        })
        .await?;
    if processes.is_empty() {
        return Err(ApiError::Internal("Failed to get process list".to_string()));
    }

    let live = assemble(&processes, &memory, &load, Utc::now()).snapshot;

    Ok(Json(json!({
        "success": true,
        "stats": {
            "timestamp": live.timestamp.timestamp(),
            "total_processes": live.total_processes,
            "total_ram_kb": live.total_ram_kb,
            "total_ram_mb": kb_to_mb(live.total_ram_kb),
            "top_process": live.top_process,
            "top_process_ram_kb": live.top_process_ram_kb,
            "cpu_load": live.cpu_load,
            "memory_total_kb": live.memory_total_kb,
            "memory_used_kb": live.memory_used_kb,
            "memory_usage_percent": live.memory_usage_percent,
        },
    })))
}
