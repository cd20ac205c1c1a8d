// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AirMon monitoring console.
//!
//! Interactive client: manage a list of servers, connect to one,
//! subscribe to a subset of its sensors and watch live readings and
//! emergency alerts.
//!
//! # Usage
//!
//! ```bash
//! airmon-client
//! airmon-client --log-level debug --history-capacity 500
//! ```

use airmon::wire::CatalogEntry;
use airmon::EventCache;
use airmon_client::directory::ServerDirectory;
use airmon_client::discovery;
use airmon_client::session::Session;
use clap::Parser;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// AirMon monitoring console.
#[derive(Parser, Debug)]
#[command(name = "airmon-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Event history capacity
    #[arg(long, default_value = "100")]
    history_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
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
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let events = Arc::new(EventCache::new(args.history_capacity));
    let mut directory = ServerDirectory::new();
    let mut session: Option<Session> = None;

    println!("AirMon - environmental monitoring console");
    println!("=========================================");

    loop {
        println!("\nMenu:");
        println!("  1. Add server");
        println!("  2. Remove server");
        println!("  3. Connect to server");
        println!("  4. List servers");
        println!("  5. Show event history");
        println!("  6. Disconnect");
        println!("  0. Quit");

        let Some(choice) = prompt("Select: ").await? else {
            break;
        };

        match choice.as_str() {
            "1" => add_server(&mut directory).await?,
            "2" => remove_server(&mut directory).await?,
            "3" => {
                if session.is_some() {
                    println!("Already connected; disconnect first (option 6).");
                } else {
                    session = connect_flow(&directory, events.clone()).await?;
                }
            }
            "4" => list_servers(&directory),
            "5" => show_history(&events),
            "6" => match session.take() {
                Some(active) => {
                    active.shutdown().await;
                    println!("Disconnected.");
                }
                None => println!("Not connected."),
            },
            "0" => break,
            other => println!("Unknown choice '{other}', try again."),
        }
    }

    if let Some(active) = session.take() {
        active.shutdown().await;
    }
    println!("Bye.");
    Ok(())
}

/// Print `text`, then read one trimmed line from stdin.
///
/// Returns `None` on end of input. The blocking read runs on the
/// blocking pool so listener tasks keep draining their sockets.
async fn prompt(text: &str) -> Result<Option<String>, std::io::Error> {
    print!("{text}");
    std::io::stdout().flush()?;

    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let bytes = std::io::stdin().read_line(&mut line)?;
        Ok::<_, std::io::Error>((bytes, line))
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))??;

    match line {
        (0, _) => Ok(None),
        (_, text) => Ok(Some(text.trim().to_string())),
    }
}

/// Prompt for a port number; `None` means cancelled or invalid input.
async fn prompt_port(text: &str) -> Result<Option<u16>, std::io::Error> {
    let Some(raw) = prompt(text).await? else {
        return Ok(None);
    };
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(Some(port)),
        _ => {
            println!("'{raw}' is not a valid port.");
            Ok(None)
        }
    }
}

async fn add_server(directory: &mut ServerDirectory) -> Result<(), std::io::Error> {
    let Some(address) = prompt("Server address (e.g. localhost): ").await? else {
        return Ok(());
    };
    if address.is_empty() {
        println!("Address cannot be empty.");
        return Ok(());
    }
    let Some(catalog_port) = prompt_port("Catalog (TCP) port: ").await? else {
        return Ok(());
    };
    let Some(telemetry_port) = prompt_port("Telemetry (UDP) port: ").await? else {
        return Ok(());
    };
    let Some(alert_port) = prompt_port("Alert (WebSocket) port: ").await? else {
        return Ok(());
    };

    let entry = directory.add(address, catalog_port, telemetry_port, alert_port);
    println!("Added {} ({}).", entry.id, entry.address);
    Ok(())
}

async fn remove_server(directory: &mut ServerDirectory) -> Result<(), std::io::Error> {
    if directory.is_empty() {
        println!("No servers to remove.");
        return Ok(());
    }
    list_servers(directory);
    let Some(id) = prompt("Server id to remove: ").await? else {
        return Ok(());
    };
    match directory.remove(&id) {
        Ok(()) => println!("Removed {id}."),
        Err(e) => println!("{e}"),
    }
    Ok(())
}

fn list_servers(directory: &ServerDirectory) {
    if directory.is_empty() {
        println!("No servers configured.");
        return;
    }
    println!("\nKnown servers:");
    for entry in directory.entries() {
        println!(
            "  {} - {} (catalog {}, telemetry {}, alerts {})",
            entry.id, entry.address, entry.catalog_port, entry.telemetry_port, entry.alert_port
        );
    }
}

fn show_history(events: &EventCache) {
    let history = events.snapshot();
    if history.is_empty() {
        println!("No events yet.");
        return;
    }
    println!("\nRecent events:");
    for event in history {
        println!("  {event}");
    }
}

/// Discovery, subscription selection and session start.
///
/// Every failure along the way is reported and leaves existing state
/// untouched; only a fully established session is returned.
async fn connect_flow(
    directory: &ServerDirectory,
    events: Arc<EventCache>,
) -> Result<Option<Session>, std::io::Error> {
    if directory.is_empty() {
        println!("No servers configured. Add one first.");
        return Ok(None);
    }

    list_servers(directory);
    let Some(id) = prompt("Server id to connect: ").await? else {
        return Ok(None);
    };
    let Some(entry) = directory.get(&id) else {
        println!("Server '{id}' not found.");
        return Ok(None);
    };
    let entry = entry.clone();

    let catalog = match discovery::fetch_catalog(&entry).await {
        Ok(catalog) => catalog,
        Err(e) => {
            println!("Discovery failed: {e}");
            return Ok(None);
        }
    };

    if catalog.is_empty() {
        println!("Server has no sensors configured.");
        return Ok(None);
    }

    println!("\nAvailable sensors:");
    for sensor in &catalog {
        println!("  {} - {} ({})", sensor.id, sensor.name, sensor.location);
    }

    let Some(raw) = prompt("Sensor ids to subscribe (comma-separated): ").await? else {
        return Ok(None);
    };
    let chosen: HashSet<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    for id in &chosen {
        if !catalog.iter().any(|sensor| sensor.id == *id) {
            println!("Ignoring unknown sensor id '{id}'.");
        }
    }

    let subscribed: Vec<CatalogEntry> = catalog
        .iter()
        .filter(|sensor| chosen.contains(sensor.id.as_str()))
        .cloned()
        .collect();
    if subscribed.is_empty() {
        println!("Nothing selected, staying disconnected.");
        return Ok(None);
    }

    match Session::connect(&entry, subscribed, events).await {
        Ok(session) => {
            println!("Connected to {}. Live readings will appear below.", entry.id);
            Ok(Some(session))
        }
        Err(e) => {
            println!("Connect failed: {e}");
            Ok(None)
        }
    }
}
