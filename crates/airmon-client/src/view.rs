// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side sensor mirror and the periodic display loop.

use airmon::wire::{CatalogEntry, Reading};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Seconds between display refreshes.
pub const DISPLAY_INTERVAL: Duration = Duration::from_secs(3);

/// Read-mostly mirror of the server's sensors, keyed by id.
///
/// The telemetry receiver is the sole writer; the display loop only
/// reads. Entries are never removed - a sensor that stops reporting is
/// stale, not evicted. Entries may lag the server or be absent entirely
/// (sensor not yet reported).
#[derive(Debug, Default)]
pub struct LocalRegistry {
    readings: RwLock<HashMap<String, Reading>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the reading for its sensor id.
    pub async fn update(&self, reading: Reading) {
        self.readings
            .write()
            .await
            .insert(reading.id.clone(), reading);
    }

    /// Latest reading for a sensor, if any has arrived.
    pub async fn get(&self, id: &str) -> Option<Reading> {
        self.readings.read().await.get(id).cloned()
    }

    /// Whether any reading has arrived for this sensor.
    pub async fn contains(&self, id: &str) -> bool {
        self.readings.read().await.contains_key(id)
    }

    /// Number of sensors that have reported at least once.
    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }
}

/// Periodically render the subscribed sensors until cancelled.
///
/// Read-only with respect to the registry; concurrent updates from the
/// telemetry receiver land between refreshes.
pub async fn run_display_loop(
    registry: Arc<LocalRegistry>,
    subscribed: Vec<CatalogEntry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // Skip the immediate first tick; the first refresh happens one full
    // period after connecting, when data may actually have arrived.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("display loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                println!("\nCurrent readings:");
                for entry in &subscribed {
                    match registry.get(&entry.id).await {
                        Some(reading) => println!(
                            "  {} ({}): {:.2} {}",
                            entry.name, entry.location, reading.value, reading.unit
                        ),
                        None => println!("  {} ({}): no data yet", entry.name, entry.location),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(id: &str, value: f64) -> Reading {
        Reading {
            id: id.into(),
            value,
            unit: "ppm".into(),
        }
    }

    #[tokio::test]
    async fn update_then_get() {
        let registry = LocalRegistry::new();
        assert!(registry.get("co").await.is_none());

        registry.update(reading("co", 4.2)).await;
        let got = registry.get("co").await.unwrap();
        assert_eq!(got.value, 4.2);
    }

    #[tokio::test]
    async fn update_replaces_previous_reading() {
        let registry = LocalRegistry::new();
        registry.update(reading("co", 1.0)).await;
        registry.update(reading("co", 2.0)).await;

        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get("co").await.unwrap().value, 2.0);
    }

    #[tokio::test]
    async fn display_loop_stops_on_cancellation() {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_display_loop(
            Arc::new(LocalRegistry::new()),
            vec![],
            Duration::from_secs(60),
            cancel.clone(),
        ));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
