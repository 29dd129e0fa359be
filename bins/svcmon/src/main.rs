use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use svcmon_monitor::{FileConfigStore, LogAuditSink, ServiceMonitor};
use svcmon_registry::{ServiceRecord, ServiceRegistry};

/// Service monitor - failure detector for a dynamic service registry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration store file path (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: String,

    /// Seed file with initially registered services (JSON array)
    #[arg(short, long, value_name = "FILE")]
    services: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug);

    info!("Starting service monitor");
    info!("Config store: {}", args.config);

    let config_store = FileConfigStore::open(&args.config)
        .with_context(|| format!("failed to open config store {}", args.config))?;

    let registry = ServiceRegistry::new();
    if let Some(path) = &args.services {
        let seeded = seed_registry(&registry, path)?;
        info!("Seeded registry with {} services from {}", seeded, path);
    }

    let mut monitor = ServiceMonitor::new(
        Arc::new(registry),
        Arc::new(config_store),
        Arc::new(LogAuditSink::new()),
    );

    match monitor.start().await {
        Ok(()) => {
            info!("Service monitor started successfully");
            wait_for_shutdown_signal().await;

            info!("Shutting down service monitor...");
            monitor
                .stop()
                .await
                .map_err(|e| anyhow::anyhow!("shutdown failed: {}", e))?;
            info!("Service monitor shut down successfully");
        }
        Err(e) => {
            error!("Failed to start service monitor: {}", e);
            return Err(anyhow::anyhow!("start failed: {}", e));
        }
    }

    Ok(())
}

fn seed_registry(registry: &ServiceRegistry, path: &str) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read services file {}", path))?;
    let records: Vec<ServiceRecord> =
        serde_json::from_str(&raw).with_context(|| format!("invalid services file {}", path))?;

    let count = records.len();
    for record in records {
        registry.register(record);
    }
    Ok(count)
}

fn initialize_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(windows)]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
