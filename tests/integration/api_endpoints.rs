//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Every response uses the success/error envelope
//! - CORS headers are present on success and on errors
//! - Unknown paths and wrong methods are 404
//! - The database endpoints persist and read back snapshots, events and config

use axum::http::StatusCode;
use chrono::Utc;
use pretty_assertions::assert_eq;
use reqwest::Client;
use routerwatch::storage::now_seconds;
use serde_json::{Value, json};

use crate::helpers::{FixedTelemetry, ScriptedCommands, snapshot_at, spawn_test_api};

async fn get_json(client: &Client, url: &str) -> (StatusCode, Value) {
    let response = client.get(url).send().await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

async fn post_json(client: &Client, url: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = client.post(url);
    let request = match body {
        Some(body) => request.json(&body),
        None => request,
    };
    let response = request.send().await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_route_listing_on_api_and_help() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    let (status, body) = get_json(&client, &server.url("/api")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["api"], "routerwatch");

    let endpoints = body["endpoints"].as_array().unwrap();
    assert_eq!(body["count"], endpoints.len());
    assert_eq!(endpoints[0]["path"], "/api/status");
    assert!(endpoints.iter().any(|e| e["path"] == "/api/database/save/snapshot"
        && e["method"] == "POST"));

    // any method gets the listing
    let response = client.delete(server.url("/api/help")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let help: Value = response.json().await.unwrap();
    assert_eq!(help["count"], body["count"]);
}

#[tokio::test]
async fn test_unknown_path_and_wrong_method_are_404() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    let (status, missing) = get_json(&client, &server.url("/api/nonexistent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        missing,
        json!({
            "success": false,
            "error": "Not Found",
            "message": "The requested endpoint does not exist",
        })
    );

    let response = client
        .put(server.url("/api/database/snapshots"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let wrong_method: Value = response.json().await.unwrap();
    assert_eq!(wrong_method, missing);
}

#[tokio::test]
async fn test_head_is_answered_like_get() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    let response = client.head(server.url("/api/status")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.bytes().await.unwrap().is_empty());

    let response = client
        .head(server.url("/api/database/save/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(server.storage.counts_by_table().await.unwrap().snapshots, 0);
}

#[tokio::test]
async fn test_cors_headers_on_success_and_error() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    for path in ["/api/status", "/api/nonexistent"] {
        let response = client.get(server.url(path)).send().await.unwrap();
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, Authorization"
        );
    }
}

#[tokio::test]
async fn test_save_snapshot_then_list() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    let (status, saved) =
        post_json(&client, &server.url("/api/database/save/snapshot"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["success"], true);
    assert_eq!(saved["message"], "Snapshot saved successfully");
    assert_eq!(saved["processes_saved"], 3);
    let snapshot_id = saved["snapshot_id"].as_i64().unwrap();

    let (status, listing) = get_json(&client, &server.url("/api/database/snapshots")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 1);
    let snapshot = &listing["snapshots"][0];
    assert_eq!(snapshot["id"], snapshot_id);
    assert_eq!(snapshot["total_processes"], 3);
    assert_eq!(snapshot["total_ram_kb"], 7168);
    assert_eq!(snapshot["top_process"], "dnsmasq");
    assert_eq!(snapshot["cpu_load"], 0.42);
    assert_eq!(snapshot["memory_used_kb"], 96_000);
    assert_eq!(snapshot["memory_usage_percent"], 75.0);

    let (status, records) = get_json(
        &client,
        &server.url(&format!("/api/database/snapshots/{snapshot_id}/processes")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records["count"], 3);
    assert_eq!(records["processes"][0]["process_name"], "dnsmasq");
    assert_eq!(records["processes"][0]["rank_position"], 1);
    assert_eq!(records["processes"][2]["rank_position"], 3);

    let (_, events) = get_json(&client, &server.url("/api/database/events?type=SNAPSHOT")).await;
    assert_eq!(events["count"], 1);
    assert_eq!(
        events["events"][0]["description"],
        "System snapshot saved with 3 processes"
    );
}

#[tokio::test]
async fn test_snapshot_limit_is_clamped_and_validated() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    for minutes in 0..3 {
        server
            .storage
            .save_snapshot(snapshot_at(
                now_seconds() - chrono::Duration::minutes(minutes),
                1000,
            ))
            .await
            .unwrap();
    }

    let (status, body) =
        get_json(&client, &server.url("/api/database/snapshots?limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["count"], 3);

    let (_, paged) = get_json(
        &client,
        &server.url("/api/database/snapshots?limit=1&offset=1"),
    )
    .await;
    assert_eq!(paged["count"], 1);
    assert_eq!(paged["snapshots"][0]["id"], body["snapshots"][1]["id"]);

    let (status, error) =
        get_json(&client, &server.url("/api/database/snapshots?limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["success"], false);
    assert_eq!(error["error"], "Bad Request");
}

#[tokio::test]
async fn test_config_lifecycle() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    let (status, _) = get_json(&client, &server.url("/api/database/config")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&client, &server.url("/api/database/config?key=ssid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, saved) = post_json(
        &client,
        &server.url("/api/database/config"),
        Some(json!({"key": "ssid", "value": "HomeNet"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["message"], "Configuration saved");

    let (status, body) = get_json(&client, &server.url("/api/database/config?key=ssid")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["value"], "HomeNet");

    let (status, _) = post_json(
        &client,
        &server.url("/api/database/config"),
        Some(json!({"key": "", "value": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = client
        .post(server.url("/api/database/config"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .delete(server.url("/api/database/config?key=ssid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .delete(server.url("/api/database/config?key=ssid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let (_, events) = get_json(&client, &server.url("/api/database/events?type=CONFIG")).await;
    assert_eq!(events["count"], 2);
    assert_eq!(events["events"][1]["description"], "Configuration updated");
    assert_eq!(events["events"][1]["data"], "ssid");
}

#[tokio::test]
async fn test_cleanup_and_stats() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    server
        .storage
        .save_snapshot(snapshot_at(Utc::now() - chrono::Duration::days(30), 500))
        .await
        .unwrap();
    server
        .storage
        .save_snapshot(snapshot_at(now_seconds(), 500))
        .await
        .unwrap();

    let (status, cleaned) =
        post_json(&client, &server.url("/api/database/cleanup?days=0"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleaned["days_kept"], 1);
    assert_eq!(cleaned["deleted"]["snapshots"], 1);

    let (status, stats) = get_json(&client, &server.url("/api/database/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["database_stats"]["snapshots"], 1);
    assert_eq!(stats["database_stats"]["events"], 1);
    assert!(stats["database_stats"]["size_bytes"].as_u64().unwrap() > 0);

    let (_, events) =
        get_json(&client, &server.url("/api/database/events?type=MAINTENANCE")).await;
    assert_eq!(
        events["events"][0]["description"],
        "Cleaned up data older than 1 days"
    );

    let (status, _) = post_json(&client, &server.url("/api/database/vacuum"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cleanup_with_huge_retention_keeps_everything() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    server
        .storage
        .save_snapshot(snapshot_at(Utc::now() - chrono::Duration::days(30), 500))
        .await
        .unwrap();

    let (status, cleaned) = post_json(
        &client,
        &server.url("/api/database/cleanup?days=1000000000"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleaned["success"], true);
    assert_eq!(cleaned["days_kept"], 1_000_000_000u64);
    assert_eq!(cleaned["deleted"]["snapshots"], 0);

    let (status, stats) = get_json(&client, &server.url("/api/database/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["database_stats"]["snapshots"], 1);
}

#[tokio::test]
async fn test_ram_trend_is_chronological() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    server
        .storage
        .save_snapshot(snapshot_at(now_seconds(), 2000))
        .await
        .unwrap();
    server
        .storage
        .save_snapshot(snapshot_at(now_seconds() - chrono::Duration::hours(2), 1000))
        .await
        .unwrap();
    server
        .storage
        .save_snapshot(snapshot_at(now_seconds() - chrono::Duration::days(10), 9))
        .await
        .unwrap();

    let (status, body) = get_json(
        &client,
        &server.url("/api/database/analytics/ram-trend?hours=1000"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hours"], 168);
    assert_eq!(body["count"], 2);
    assert_eq!(body["trend"][0]["ram_kb"], 1000);
    assert_eq!(body["trend"][1]["ram_kb"], 2000);
}

#[tokio::test]
async fn test_top_processes() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    let (status, body) =
        get_json(&client, &server.url("/api/monitoring/processes/top/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["processes"][0]["name"], "dnsmasq");
    assert_eq!(body["processes"][1]["rank"], 2);

    let (status, _) = get_json(&client, &server.url("/api/monitoring/processes/top/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_process_list_is_internal_error() {
    let telemetry = FixedTelemetry {
        processes: Vec::new(),
        ..FixedTelemetry::default()
    };
    let server = spawn_test_api(telemetry, ScriptedCommands::default()).await;
    let client = Client::new();

    let (status, body) = get_json(&client, &server.url("/api/monitoring/processes")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal Server Error");
    assert_eq!(body["message"], "Failed to get process list");
}

#[tokio::test]
async fn test_network_endpoints_use_commands() {
    let commands = ScriptedCommands::default()
        .with("ip route show", "default via 192.168.1.1 dev eth0\n10.0.0.0/8 dev br-lan\n")
        .with("ping -c 3 -W 2 openwrt.org 2>&1 | tail -1", "rtt min/avg/max/mdev = 1/2/3/0 ms");
    let server = spawn_test_api(FixedTelemetry::default(), commands).await;
    let client = Client::new();

    let (status, routes) = get_json(&client, &server.url("/api/network/routes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(routes["count"], 2);

    let (status, ping) =
        get_json(&client, &server.url("/api/network/ping?target=openwrt.org")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ping["result"], "rtt min/avg/max/mdev = 1/2/3/0 ms");

    let (status, _) =
        get_json(&client, &server.url("/api/network/ping?target=a%3Breboot")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!server.commands.executed().iter().any(|c| c.contains("reboot")));

    let (status, body) = get_json(&client, &server.url("/api/network/ping?target=-f")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(!server.commands.executed().iter().any(|c| c.contains(" -f")));

    let (status, leases) = get_json(&client, &server.url("/api/network/dhcp/leases")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(leases["leases"][0]["hostname"], "laptop");
}

#[tokio::test]
async fn test_missing_leases_and_silent_radio() {
    let telemetry = FixedTelemetry {
        leases: None,
        ..FixedTelemetry::default()
    };
    let server = spawn_test_api(telemetry, ScriptedCommands::default()).await;
    let client = Client::new();

    let (status, _) = get_json(&client, &server.url("/api/network/dhcp/leases")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get_json(&client, &server.url("/api/wireless/status")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service Unavailable");
}

#[tokio::test]
async fn test_system_endpoints() {
    let server = spawn_test_api(FixedTelemetry::default(), ScriptedCommands::default()).await;
    let client = Client::new();

    let (_, uptime) = get_json(&client, &server.url("/api/system/uptime")).await;
    assert_eq!(uptime["uptime_seconds"], 93_784);
    assert_eq!(uptime["uptime_formatted"], "1d 2h 3m");

    let (_, load) = get_json(&client, &server.url("/api/system/load")).await;
    assert_eq!(load["load_5m"], 0.3);

    let (_, version) = get_json(&client, &server.url("/api/version")).await;
    assert_eq!(version["openwrt_version"], "OpenWrt 23.05.3 r23809");

    let (_, health) = get_json(&client, &server.url("/api/health")).await;
    assert_eq!(health["status"], "healthy");
}
