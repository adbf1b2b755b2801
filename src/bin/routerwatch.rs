use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use routerwatch::{
    actors::StorageHandle,
    api::{ApiConfig, ApiState, BlockingPool, Dispatcher, RouteTable, routes::register_endpoints},
    collectors::{HostTelemetry, ShellRunner},
    config::{Config, read_config_file},
    storage::{EventKind, open_backend},
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Router telemetry HTTP API")]
struct Args {
    /// Port to listen on
    port: Option<u16>,

    /// SQLite database path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Config file
    #[arg(short, long)]
    file: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new()
        .with_targets(vec![("routerwatch", level), ("tower_http", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

/// File, then environment, then command line
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.file {
        Some(path) => read_config_file(path).with_context(|| format!("reading {path}"))?,
        None => Config::default(),
    };
    let mut config = config.with_env_overrides();

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(path) = &args.db {
        config.storage = config.storage.with_path(path.clone());
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let config = load_config(&args)?;

    let backend = open_backend(&config.storage)
        .await
        .context("failed to open storage")?;
    let storage = StorageHandle::spawn_with_retention(backend, config.storage.retention_policy());

    if let Err(e) = storage
        .log_event(EventKind::Startup.as_str(), "API server starting", None)
        .await
    {
        error!("failed to log startup event: {e}");
    }

    let mut routes = RouteTable::new();
    register_endpoints(&mut routes).context("failed to register endpoints")?;

    let state = ApiState::new(
        storage.clone(),
        Arc::new(HostTelemetry::new()),
        Arc::new(ShellRunner),
        BlockingPool::new(
            config.workers.max_blocking,
            Duration::from_secs(config.workers.command_timeout_secs),
        ),
        config.storage.retention_days(),
    );

    let api_config = ApiConfig {
        bind_addr: SocketAddr::new(config.server.address, config.server.port),
        enable_cors: config.enable_cors,
    };
    let addr = routerwatch::api::spawn_api_server(api_config, Dispatcher::new(routes, state)).await?;
    info!("routerwatch listening on http://{addr}/api");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    if let Err(e) = storage
        .log_event(EventKind::Shutdown.as_str(), "API server shutting down", None)
        .await
    {
        error!("failed to log shutdown event: {e}");
    }
    storage.shutdown().await;

    Ok(())
}
