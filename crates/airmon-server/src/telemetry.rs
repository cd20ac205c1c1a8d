// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry publication over UDP.
//!
//! Every generation tick emits the sensor's reading as one datagram to a
//! pre-known endpoint. Best-effort and unordered across sensors: no
//! acknowledgement, no retry, no back-pressure. A lost datagram is a
//! missed reading for that tick, nothing more.

use crate::error::ServerError;
use crate::registry::SensorRegistry;
use airmon::wire::{self, Reading};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sends readings to the configured telemetry endpoint.
///
/// One long-lived outbound socket is shared by all sensors rather than a
/// fresh socket per tick.
pub struct TelemetryPublisher {
    socket: UdpSocket,
    target: SocketAddr,
}

impl TelemetryPublisher {
    /// Open the outbound socket.
    pub async fn new(target: SocketAddr) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        info!("telemetry publishing to {}", target);
        Ok(Self { socket, target })
    }

    /// Send one reading. Failures are logged and never propagate - the
    /// next generation tick proceeds regardless.
    pub async fn publish(&self, reading: &Reading) {
        match wire::encode_reading(reading) {
            Ok(datagram) => {
                if let Err(e) = self.socket.send_to(&datagram, self.target).await {
                    warn!("telemetry send to {} failed: {}", self.target, e);
                }
            }
            Err(e) => {
                warn!("failed to encode reading for '{}': {}", reading.id, e);
            }
        }
    }
}

/// Spawn one generation task per sensor.
///
/// Each task draws a new value on a fixed interval and hands the reading
/// to the publisher. Per-sensor RNG streams are derived from the process
/// seed and the sensor's position in sorted-id order, so runs with the
/// same config are reproducible.
pub fn spawn_generators(
    registry: &Arc<SensorRegistry>,
    publisher: Arc<TelemetryPublisher>,
    interval: Duration,
    seed: u64,
    shutdown: Arc<Notify>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::with_capacity(registry.len());

    for (index, id) in registry.ids().into_iter().enumerate() {
        let Some(cell) = registry.get(&id).cloned() else {
            continue;
        };
        let publisher = publisher.clone();
        let shutdown = shutdown.clone();

        tasks.push(tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let value = cell.generate(&mut rng);
                        debug!("generated {} = {:.2} {}", id, value, cell.spec().unit);
                        publisher.publish(&cell.reading()).await;
                    }
                    _ = shutdown.notified() => {
                        debug!("generator for '{}' shutting down", id);
                        break;
                    }
                }
            }
        }));
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use airmon::SensorSpec;
    use tokio::time::timeout;

    fn spec(id: &str, min: f64, max: f64) -> SensorSpec {
        SensorSpec {
            id: id.into(),
            name: format!("Sensor {id}"),
            location: "Test bench".into(),
            unit: "ppm".into(),
            min,
            max,
        }
    }

    async fn local_target() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    #[tokio::test]
    async fn publish_delivers_one_decodable_datagram() {
        let (receiver, target) = local_target().await;
        let publisher = TelemetryPublisher::new(target).await.unwrap();

        let reading = Reading {
            id: "co".into(),
            value: 12.34,
            unit: "ppm".into(),
        };
        publisher.publish(&reading).await;

        let mut buf = [0u8; 1024];
        let (len, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(wire::decode_reading(&buf[..len]).unwrap(), reading);
    }

    #[tokio::test]
    async fn generators_publish_readings_within_range() {
        let (receiver, target) = local_target().await;
        let registry = Arc::new(SensorRegistry::from_specs(vec![spec("pm25", 0.0, 500.0)]));
        let publisher = Arc::new(TelemetryPublisher::new(target).await.unwrap());
        let shutdown = Arc::new(Notify::new());

        let tasks = spawn_generators(
            &registry,
            publisher,
            Duration::from_millis(10),
            7,
            shutdown.clone(),
        );
        assert_eq!(tasks.len(), 1);

        let mut buf = [0u8; 1024];
        let (len, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let reading = wire::decode_reading(&buf[..len]).unwrap();
        assert_eq!(reading.id, "pm25");
        assert!((0.0..=500.0).contains(&reading.value));

        shutdown.notify_waiters();
        for task in tasks {
            timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn send_failure_does_not_stop_publishing() {
        // Port 9 on localhost: nothing listens, sends may fail with
        // connection-refused on some platforms. Either way publish must
        // return normally.
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let publisher = TelemetryPublisher::new(target).await.unwrap();

        for _ in 0..3 {
            publisher
                .publish(&Reading {
                    id: "co".into(),
                    value: 1.0,
                    unit: "ppm".into(),
                })
                .await;
        }
    }
}
