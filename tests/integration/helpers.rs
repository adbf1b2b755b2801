//! Helper functions for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use routerwatch::{
    HostInfo, LoadReading, MemoryReading, ProcessSample,
    actors::StorageHandle,
    collectors::{CommandRunner, TelemetrySource},
    storage::{Snapshot, StorageBackend, sqlite::SqliteBackend},
};
use tempfile::TempDir;

/// Telemetry source returning canned values
#[derive(Debug, Clone)]
pub struct FixedTelemetry {
    pub processes: Vec<ProcessSample>,
    pub memory: MemoryReading,
    pub load: String,
    pub leases: Option<String>,
}

impl Default for FixedTelemetry {
    fn default() -> Self {
        Self {
            processes: vec![
                process(1200, "dnsmasq", 4096),
                process(900, "hostapd", 2048),
                process(1, "procd", 1024),
            ],
            memory: MemoryReading {
                total_kb: 128_000,
                free_kb: 32_000,
                available_kb: 64_000,
                buffers_kb: 4_000,
                cached_kb: 16_000,
            },
            load: "0.42 0.30 0.25 1/80 1234".to_string(),
            leases: Some(
                "1717243200 aa:bb:cc:dd:ee:ff 192.168.1.100 laptop *\n".to_string(),
            ),
        }
    }
}

impl TelemetrySource for FixedTelemetry {
    fn processes(&self) -> anyhow::Result<Vec<ProcessSample>> {
        Ok(self.processes.clone())
    }

    fn memory(&self) -> anyhow::Result<MemoryReading> {
        Ok(self.memory)
    }

    fn load(&self) -> anyhow::Result<LoadReading> {
        Ok(LoadReading(self.load.clone()))
    }

    fn uptime(&self) -> anyhow::Result<f64> {
        Ok(93_784.5)
    }

    fn host_info(&self) -> anyhow::Result<HostInfo> {
        Ok(HostInfo {
            hostname: Some("OpenWrt".to_string()),
            kernel_version: Some("5.15.150".to_string()),
            os_version: Some("23.05".to_string()),
            cpu_model: Some("MIPS 24Kc V7.4".to_string()),
            cpu_count: 1,
            openwrt_version: Some("OpenWrt 23.05.3 r23809".to_string()),
        })
    }

    fn dhcp_leases(&self) -> anyhow::Result<Option<String>> {
        Ok(self.leases.clone())
    }
}

/// Command runner answering from a table and remembering what it ran
#[derive(Debug, Default, Clone)]
pub struct ScriptedCommands {
    pub outputs: HashMap<String, String>,
    pub executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedCommands {
    pub fn with(mut self, command: &str, output: &str) -> Self {
        self.outputs.insert(command.to_string(), output.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedCommands {
    fn run(&self, command: &str) -> anyhow::Result<String> {
        self.executed.lock().unwrap().push(command.to_string());
        Ok(self.outputs.get(command).cloned().unwrap_or_default())
    }
}

pub fn process(pid: u32, name: &str, ram_kb: u64) -> ProcessSample {
    ProcessSample {
        pid,
        name: name.to_string(),
        ram_kb,
    }
}

pub fn snapshot_at(timestamp: DateTime<Utc>, total_ram_kb: u64) -> Snapshot {
    Snapshot {
        id: None,
        timestamp,
        total_processes: 1,
        total_ram_kb,
        top_process: "dnsmasq".to_string(),
        top_process_ram_kb: total_ram_kb,
        cpu_load: 0.5,
        memory_total_kb: 128_000,
        memory_free_kb: 64_000,
        memory_used_kb: 64_000,
        memory_usage_percent: 50.0,
    }
}

/// SQLite-backed storage actor in a fresh temp directory
pub async fn sqlite_storage() -> (StorageHandle, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let backend = SqliteBackend::new(temp_dir.path().join("routerwatch.db"))
        .await
        .unwrap();
    let handle = StorageHandle::spawn(Box::new(backend) as Box<dyn StorageBackend>);
    (handle, temp_dir)
}

/// A running server with its storage
#[cfg(feature = "api")]
pub struct TestServer {
    pub addr: SocketAddr,
    pub storage: StorageHandle,
    pub commands: ScriptedCommands,
    _temp_dir: TempDir,
}

#[cfg(feature = "api")]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[cfg(feature = "api")]
pub async fn spawn_test_api(telemetry: FixedTelemetry, commands: ScriptedCommands) -> TestServer {
    use routerwatch::api::{
        ApiConfig, ApiState, BlockingPool, Dispatcher, RouteTable, routes::register_endpoints,
        spawn_api_server,
    };

    let (storage, temp_dir) = sqlite_storage().await;

    let mut routes = RouteTable::new();
    register_endpoints(&mut routes).unwrap();

    let state = ApiState::new(
        storage.clone(),
        Arc::new(telemetry),
        Arc::new(commands.clone()),
        BlockingPool::new(2, Duration::from_secs(5)),
        7,
    );

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: true,
    };
    let addr = spawn_api_server(config, Dispatcher::new(routes, state))
        .await
        .unwrap();

    TestServer {
        addr,
        storage,
        commands,
        _temp_dir: temp_dir,
    }
}
