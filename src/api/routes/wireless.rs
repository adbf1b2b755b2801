//! Wireless endpoints

use axum::Json;
use serde_json::{Value, json};
use tracing::info;

use super::output_lines;
use crate::api::error::{ApiError, ApiResult};
use crate::api::request::ApiRequest;
use crate::api::router::{HttpMethod, RouteError, RouteTable};
use crate::api::state::ApiState;

/// `wifi status` output this short means the radio reported nothing
const MIN_STATUS_LEN: usize = 10;

pub fn register(table: &mut RouteTable<ApiState>) -> Result<(), RouteError> {
    table.register(HttpMethod::Get, "/api/wireless/status", status, "Radio status")?;
    table.register(HttpMethod::Get, "/api/wireless/scan", scan, "Nearby networks")?;
    table.register(HttpMethod::Get, "/api/wireless/config", config, "SSID, mode and channel")?;
    table.register(
        HttpMethod::Get,
        "/api/wireless/clients",
        clients,
        "Associated station count",
    )?;
    table.register(
        HttpMethod::Post,
        "/api/wireless/restart",
        restart,
        "Restart wireless interfaces",
    )?;
    Ok(())
}

/// GET /api/wireless/status
///
/// Passes `wifi status` JSON through; plain text is returned as a string.
pub async fn status(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let output = state.shell("wifi status 2>/dev/null").await?;
    if output.len() <= MIN_STATUS_LEN {
        return Err(ApiError::Unavailable(
            "wireless status not available".to_string(),
        ));
    }

    let wireless = serde_json::from_str(&output).unwrap_or(Value::String(output));

    Ok(Json(json!({
        "success": true,
        "wireless": wireless,
    })))
}

/// Pull the names out of `ESSID:"name"` lines
fn parse_essids(output: &str) -> Vec<String> {
    output_lines(output)
        .into_iter()
        .filter_map(|line| {
            let (_, name) = line.split_once("ESSID:")?;
            Some(name.trim_matches('"').to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// GET /api/wireless/scan
pub async fn scan(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let output = state
        .shell("iwlist scan 2>/dev/null | grep ESSID | head -10")
        .await?;
    let networks = parse_essids(&output);

    Ok(Json(json!({
        "success": true,
        "count": networks.len(),
        "networks": networks,
    })))
}

/// GET /api/wireless/config
pub async fn config(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let ssid = state
        .shell("uci get wireless.@wifi-iface[0].ssid 2>/dev/null || echo 'unknown'")
        .await?;
    let mode = state
        .shell("uci get wireless.@wifi-iface[0].mode 2>/dev/null || echo 'unknown'")
        .await?;
    let encryption = state
        .shell("uci get wireless.@wifi-iface[0].encryption 2>/dev/null || echo 'unknown'")
        .await?;
    let channel = state
        .shell("uci get wireless.radio0.channel 2>/dev/null || echo 'auto'")
        .await?;

    Ok(Json(json!({
        "success": true,
        "config": {
            "ssid": ssid,
            "mode": mode,
            "encryption": encryption,
            "channel": channel,
        },
    })))
}

/// GET /api/wireless/clients
pub async fn clients(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let output = state
        .shell("iw dev wlan0 station dump 2>/dev/null | grep Station | wc -l")
        .await?;
    let count: u32 = output.trim().parse().unwrap_or(0);

    Ok(Json(json!({
        "success": true,
        "clients": count,
    })))
}

/// POST /api/wireless/restart
pub async fn restart(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    info!("restarting wireless interfaces");
    state.shell("(wifi down && wifi up) >/dev/null 2>&1 &").await?;

    Ok(Json(json!({
        "success": true,
        "message": "Wireless restart initiated",
    })))
}
