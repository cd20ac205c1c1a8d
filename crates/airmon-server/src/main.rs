// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AirMon telemetry server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: catalog on :8080, alerts on :8081, telemetry to 127.0.0.1:9090
//! airmon-server
//!
//! # Custom ports and telemetry target
//! airmon-server --catalog-port 7200 --alert-port 7201 --telemetry-target 10.0.0.5:9090
//!
//! # Full configuration from a JSON file
//! airmon-server --config server.json
//! ```

use airmon_server::alerts::{spawn_alert_timer, AlertBroadcaster, AlertServer};
use airmon_server::catalog::CatalogServer;
use airmon_server::config::ServerConfig;
use airmon_server::error::ServerError;
use airmon_server::registry::SensorRegistry;
use airmon_server::telemetry::{spawn_generators, TelemetryPublisher};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// AirMon telemetry server - catalog, UDP readings and WebSocket alerts.
#[derive(Parser, Debug)]
#[command(name = "airmon-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address for the TCP and WebSocket listeners
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// TCP port for catalog discovery
    #[arg(long, default_value = "8080")]
    catalog_port: u16,

    /// Port for the WebSocket alert channel
    #[arg(long, default_value = "8081")]
    alert_port: u16,

    /// Destination address for telemetry datagrams
    #[arg(long, default_value = "127.0.0.1:9090")]
    telemetry_target: String,

    /// RNG seed for reading generation and alert sampling
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Configuration file (JSON format); overrides the flags above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = if let Some(config_path) = args.config {
        info!("loading config from {:?}", config_path);
        ServerConfig::from_file(&config_path)?
    } else {
        ServerConfig {
            bind_address: args.bind.parse()?,
            catalog_port: args.catalog_port,
            alert_port: args.alert_port,
            telemetry_target: args.telemetry_target.parse()?,
            seed: args.seed,
            ..Default::default()
        }
    };
    config.validate()?;

    info!("airmon-server v{}", env!("CARGO_PKG_VERSION"));
    info!("sensors: {}", config.sensors.len());
    info!("seed: {}", config.seed);

    // Bind both listening roles before spawning anything: a port that
    // cannot be bound aborts startup instead of leaving a half-alive
    // server behind.
    let catalog_addr = config.catalog_addr();
    let catalog_listener = TcpListener::bind(catalog_addr)
        .await
        .map_err(|e| ServerError::Bind(catalog_addr, e))?;
    info!("catalog listening on {}", catalog_addr);

    let alert_addr = config.alert_addr();
    let alert_listener = TcpListener::bind(alert_addr)
        .await
        .map_err(|e| ServerError::Bind(alert_addr, e))?;
    info!("alert channel on ws://{}{}", alert_addr, airmon::wire::ALERTS_PATH);

    let registry = Arc::new(SensorRegistry::from_specs(config.sensors.clone()));
    let shutdown = Arc::new(Notify::new());

    let publisher = Arc::new(TelemetryPublisher::new(config.telemetry_target).await?);
    let generators = spawn_generators(
        &registry,
        publisher,
        config.generation_interval(),
        config.seed,
        shutdown.clone(),
    );

    let broadcaster = Arc::new(AlertBroadcaster::new(&registry, config.alert_probability));
    let alert_timer = spawn_alert_timer(
        broadcaster.clone(),
        config.alert_interval(),
        config.seed,
        shutdown.clone(),
    );

    let catalog = CatalogServer::new(registry.clone(), shutdown.clone());
    let alert_server = AlertServer::new(broadcaster, shutdown.clone());

    // Handle shutdown signals
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, stopping server...");
        shutdown_signal.notify_waiters();
    });

    let (catalog_result, alert_result) = tokio::join!(
        catalog.run_on(catalog_listener),
        alert_server.run_on(alert_listener),
    );
    catalog_result?;
    alert_result?;

    for task in generators {
        task.await?;
    }
    alert_timer.await?;

    info!("server stopped");
    Ok(())
}
