//! prometopo server - headless topology discovery daemon
//!
//! Queries the configured Prometheus servers on a fixed interval, turns the
//! samples into a topology and pushes each outcome as a JSON line to stdout.
//!
//! # Usage
//! ```sh
//! PROMETHEUS_ADDRESSES=http://prometheus:9090 cargo run --bin server -- --once
//! ```
//!
//! # Environment Variables
//! - `PROMETHEUS_ADDRESSES` - Comma separated Prometheus base URLs
//! - `PROMETHEUS_EXPORTERS` - Query presets to run (istio, gateway)
//! - `TARGET_SCOPE` - Scope mixed into every entity id (default: prometheus)
//! - `DISCOVERY_INTERVAL_SECS` - Seconds between discovery passes (default: 600)
//! - `OBSERVABILITY_ENABLED` - Record self-metrics (default: true)

use anyhow::{Context, Result};
use clap::Parser;
use prometopo::application::discovery::DiscoveryClient;
use prometopo::application::service::DiscoveryService;
use prometopo::config::Config;
use prometopo::infrastructure::ExporterFactory;
use prometopo::infrastructure::observability::{JsonStdoutSink, Metrics};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Prometheus metric-to-topology discovery", long_about = None)]
struct Cli {
    /// Run a single discovery pass and exit
    #[arg(long)]
    once: bool,

    /// Override DISCOVERY_INTERVAL_SECS
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries only topology lines
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    info!("prometopo server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Addresses={:?}, Exporters={:?}, Scope={}",
        config.prometheus.addresses, config.prometheus.exporters, config.topology.scope
    );

    let metrics = if config.observability.enabled {
        Some(Metrics::new().context("Failed to create metrics registry")?)
    } else {
        info!("Self-metrics disabled.");
        None
    };

    let exporters = ExporterFactory::create_exporters(&config, metrics.clone())?;
    let mut client = DiscoveryClient::new(config.topology_settings(), exporters);
    if let Some(metrics) = &metrics {
        client = client.with_metrics(metrics.clone());
    }

    let sink = Arc::new(JsonStdoutSink::new(config.topology.scope.clone()));
    let interval = cli
        .interval
        .unwrap_or(config.observability.discovery_interval_secs);
    let service = DiscoveryService::new(Arc::new(client), sink, interval);

    if cli.once {
        let response = service.run_once().await;
        if let Some(metrics) = &metrics {
            eprintln!("{}", metrics.render());
        }
        if !response.is_success() {
            anyhow::bail!("Discovery failed");
        }
        return Ok(());
    }

    info!("Server running. Press Ctrl+C to shutdown.");
    tokio::select! {
        _ = service.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received. Exiting...");
        }
    }

    if let Some(metrics) = &metrics {
        eprintln!("{}", metrics.render());
    }
    Ok(())
}
