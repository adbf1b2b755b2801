//! Integration tests for storage persistence
//!
//! These tests verify that:
//! - Snapshots and their process records survive a restart of the actor
//! - Retention removes old snapshots together with their process records
//! - Events and config entries are persisted through the storage actor

use chrono::Duration;
use pretty_assertions::assert_eq;
use routerwatch::{
    LoadReading, MemoryReading,
    actors::StorageHandle,
    snapshot::assemble,
    storage::{Snapshot, StorageBackend, now_seconds, sqlite::SqliteBackend},
};
use tempfile::tempdir;

use crate::helpers::{process, snapshot_at, sqlite_storage};

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("routerwatch.db");

    let processes = vec![
        process(10, "uhttpd", 3000),
        process(11, "odhcpd", 2000),
        process(12, "netifd", 1000),
    ];
    let memory = MemoryReading {
        total_kb: 1000,
        free_kb: 250,
        ..MemoryReading::default()
    };
    let load = LoadReading("1.5 1.0 0.5".to_string());
    let assembled = assemble(&processes, &memory, &load, now_seconds());

    let snapshot_id = {
        let backend = SqliteBackend::new(&db_path).await.unwrap();
        let handle = StorageHandle::spawn(Box::new(backend) as Box<dyn StorageBackend>);

        let id = handle.save_snapshot(assembled.snapshot.clone()).await.unwrap();
        let saved = handle
            .save_process_records(id, assembled.records.clone())
            .await
            .unwrap();
        assert_eq!(saved, 3);

        handle.shutdown().await;
        id
    };

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let handle = StorageHandle::spawn(Box::new(backend) as Box<dyn StorageBackend>);

    let snapshots = handle.get_snapshots(10, 0).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        snapshots[0],
        Snapshot {
            id: Some(snapshot_id),
            ..assembled.snapshot.clone()
        }
    );
    assert_eq!(snapshots[0].total_ram_kb, 6000);
    assert_eq!(snapshots[0].top_process, "uhttpd");
    assert_eq!(snapshots[0].top_process_ram_kb, 3000);
    assert_eq!(snapshots[0].total_processes, 3);
    assert_eq!(snapshots[0].memory_total_kb, 1000);
    assert_eq!(snapshots[0].memory_free_kb, 250);
    assert_eq!(snapshots[0].memory_used_kb, 750);
    assert_eq!(snapshots[0].memory_usage_percent, 75.0);
    assert_eq!(snapshots[0].cpu_load, 1.5);

    let latest = handle.get_snapshots(1, 0).await.unwrap();
    assert_eq!(latest, snapshots);

    let records = handle.get_process_records(snapshot_id).await.unwrap();
    let names: Vec<_> = records.iter().map(|r| r.process_name.as_str()).collect();
    assert_eq!(names, vec!["uhttpd", "odhcpd", "netifd"]);
    assert!(records.iter().all(|r| r.snapshot_id == Some(snapshot_id)));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_retention_cascades_to_process_records() {
    let (handle, _temp_dir) = sqlite_storage().await;

    let old = snapshot_at(now_seconds() - Duration::days(10), 100);
    let fresh = snapshot_at(now_seconds(), 200);

    let records_for = |name: &str, ram_kb, timestamp| {
        assemble(
            &[process(1, name, ram_kb)],
            &MemoryReading::default(),
            &LoadReading::default(),
            timestamp,
        )
        .records
    };
    let old_records = records_for("old", 100, old.timestamp);
    let fresh_records = records_for("fresh", 200, fresh.timestamp);

    let old_id = handle.save_snapshot(old).await.unwrap();
    handle.save_process_records(old_id, old_records).await.unwrap();
    let fresh_id = handle.save_snapshot(fresh).await.unwrap();
    handle
        .save_process_records(fresh_id, fresh_records)
        .await
        .unwrap();

    let report = handle.cleanup(7).await.unwrap();
    assert_eq!(report.snapshots, 1);
    assert_eq!(report.process_records, 1);

    assert!(handle.get_process_records(old_id).await.unwrap().is_empty());
    assert_eq!(handle.get_process_records(fresh_id).await.unwrap().len(), 1);

    let counts = handle.counts_by_table().await.unwrap();
    assert_eq!(counts.snapshots, 1);
    assert_eq!(counts.process_records, 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_events_and_config_through_actor() {
    let (handle, _temp_dir) = sqlite_storage().await;

    handle.log_event("STARTUP", "API server starting", None).await.unwrap();
    handle
        .log_event("CONFIG", "Configuration updated", Some("ssid".to_string()))
        .await
        .unwrap();

    let all = handle.get_events(50, 0, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].event_type, "CONFIG");
    assert_eq!(all[1].data, "");

    let startup = handle
        .get_events(50, 0, Some("STARTUP".to_string()))
        .await
        .unwrap();
    assert_eq!(startup.len(), 1);

    handle.set_config("ssid", "first").await.unwrap();
    handle.set_config("ssid", "second").await.unwrap();
    assert_eq!(handle.get_config("ssid").await.unwrap().unwrap().value, "second");
    assert_eq!(handle.counts_by_table().await.unwrap().config_entries, 1);

    handle.shutdown().await;
}
