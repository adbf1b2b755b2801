//! Network state endpoints, answered by shell commands

use std::sync::LazyLock;

use axum::Json;
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};

use super::output_lines;
use crate::api::error::{ApiError, ApiResult};
use crate::api::request::ApiRequest;
use crate::api::router::{HttpMethod, RouteError, RouteTable};
use crate::api::state::ApiState;

const DEFAULT_PING_TARGET: &str = "8.8.8.8";

/// Host names, IPv4 and IPv6 literals; nothing a shell would interpret and
/// nothing `ping` would read as an option
static PING_TARGET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9:][A-Za-z0-9.:\-]{0,252}$").ok());

pub fn register(table: &mut RouteTable<ApiState>) -> Result<(), RouteError> {
    table.register(
        HttpMethod::Get,
        "/api/network/interfaces",
        interfaces,
        "Network interface names",
    )?;
    table.register(HttpMethod::Get, "/api/network/routes", routes, "Routing table")?;
    table.register(HttpMethod::Get, "/api/network/wan", wan, "WAN address and gateway")?;
    table.register(HttpMethod::Get, "/api/network/lan", lan, "LAN address and netmask")?;
    table.register(
        HttpMethod::Get,
        "/api/network/dhcp/leases",
        dhcp_leases,
        "Active DHCP leases",
    )?;
    table.register(
        HttpMethod::Get,
        "/api/network/ping",
        ping,
        "Ping a host (?target=, default 8.8.8.8)",
    )?;
    Ok(())
}

/// GET /api/network/interfaces
pub async fn interfaces(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let output = state
        .shell("ip addr show | grep -E '^[0-9]+:' | awk '{print $2}' | tr -d ':'")
        .await?;
    let interfaces = output_lines(&output);

    Ok(Json(json!({
        "success": true,
        "count": interfaces.len(),
        "interfaces": interfaces,
    })))
}

/// GET /api/network/routes
pub async fn routes(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let output = state.shell("ip route show").await?;
    let routes = output_lines(&output);

    Ok(Json(json!({
        "success": true,
        "count": routes.len(),
        "routes": routes,
    })))
}

/// GET /api/network/wan
pub async fn wan(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let ipaddr = state
        .shell("uci get network.wan.ipaddr 2>/dev/null || echo 'DHCP'")
        .await?;
    let gateway = state
        .shell("ip route show default | awk '{print $3}' | head -1")
        .await?;

    Ok(Json(json!({
        "success": true,
        "wan": {
            "ipaddr": ipaddr,
            "gateway": if gateway.is_empty() { "unknown".to_string() } else { gateway },
        },
    })))
}

/// GET /api/network/lan
pub async fn lan(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let ipaddr = state
        .shell("uci get network.lan.ipaddr 2>/dev/null || echo 'unknown'")
        .await?;
    let netmask = state
        .shell("uci get network.lan.netmask 2>/dev/null || echo 'unknown'")
        .await?;

    Ok(Json(json!({
        "success": true,
        "lan": {
            "ipaddr": ipaddr,
            "netmask": netmask,
        },
    })))
}

/// One line of a dnsmasq lease file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpLease {
    pub expires: i64,
    pub mac: String,
    pub ip: String,
    pub hostname: String,
}

/// Parse `<expiry> <mac> <ip> <hostname> <client-id>` lines, skipping short ones
pub fn parse_leases(content: &str) -> Vec<DhcpLease> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let expires = fields.next()?.parse().ok()?;
            let mac = fields.next()?.to_string();
            let ip = fields.next()?.to_string();
            let hostname = fields.next().unwrap_or("*").to_string();
            Some(DhcpLease {
                expires,
                mac,
                ip,
                hostname,
            })
        })
        .collect()
}

/// GET /api/network/dhcp/leases
pub async fn dhcp_leases(_request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let content = state
        .telemetry(|telemetry| telemetry.dhcp_leases())
        .await?
        .ok_or_else(|| ApiError::NotFound("DHCP leases file not found".to_string()))?;
    let leases = parse_leases(&content);

    Ok(Json(json!({
        "success": true,
        "count": leases.len(),
        "leases": leases,
    })))
}

fn valid_ping_target(target: &str) -> bool {
    PING_TARGET
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(target))
}

/// GET /api/network/ping?target=
pub async fn ping(request: ApiRequest, state: ApiState) -> ApiResult<Json<Value>> {
    let target = request
        .query_value("target")
        .unwrap_or(DEFAULT_PING_TARGET)
        .to_string();

    if !valid_ping_target(&target) {
        return Err(ApiError::InvalidRequest(format!(
            "invalid ping target: {target}"
        )));
    }

    let result = state
        .shell(format!("ping -c 3 -W 2 {target} 2>&1 | tail -1"))
        .await?;

    Ok(Json(json!({
        "success": true,
        "target": target,
        "result": result,
    })))
}
