// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Emergency alert broadcasting over WebSocket.
//!
//! Clients upgrade on `/alerts` and then only read: the server pushes each
//! synthesized alert as one JSON text frame to every subscriber. A
//! subscriber whose channel has gone away is pruned during the broadcast;
//! pruning one never aborts delivery to the rest.

use crate::error::ServerError;
use crate::registry::SensorRegistry;
use airmon::model::{AlertLevel, EmergencyAlert};
use airmon::wire;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Fixed catalog of alert texts, sampled uniformly.
const ALERT_MESSAGES: [&str; 5] = [
    "Threshold exceeded",
    "Reading spiked above safe limits",
    "Sustained elevated concentration",
    "Calibration drift detected",
    "Hazardous concentration detected",
];

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Owns the subscriber set and synthesizes alerts.
pub struct AlertBroadcaster {
    /// Ids known at startup; the registry is fixed, so this never changes.
    sensor_ids: Vec<String>,
    probability: f64,
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>,
    next_subscriber: AtomicU64,
}

impl AlertBroadcaster {
    pub fn new(registry: &SensorRegistry, probability: f64) -> Self {
        Self {
            sensor_ids: registry.ids(),
            probability,
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber: AtomicU64::new(1),
        }
    }

    /// Register a push-channel subscriber.
    pub fn subscribe(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().insert(id, tx);
        (id, rx)
    }

    /// Drop a subscriber, if still present.
    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().remove(&id);
    }

    /// Number of currently subscribed connections.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Send one serialized frame to every subscriber, pruning those whose
    /// channel is closed. Returns how many subscribers were delivered to.
    ///
    /// The lock is held for channel handoff only, never across a network
    /// write - the per-connection forward task does the actual socket I/O.
    pub fn broadcast(&self, frame: &str) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        subscribers.retain(|id, tx| {
            if tx.send(frame.to_string()).is_ok() {
                delivered += 1;
                true
            } else {
                debug!("pruning disconnected alert subscriber {}", id);
                false
            }
        });
        delivered
    }

    /// Maybe synthesize one alert: a probability gate, then uniform draws
    /// over the known sensor ids, severities and message catalog.
    pub fn synthesize(&self, rng: &mut impl Rng, timestamp_ms: u64) -> Option<EmergencyAlert> {
        if self.sensor_ids.is_empty() || !rng.gen_bool(self.probability) {
            return None;
        }

        let sensor_id = self.sensor_ids.choose(rng)?.clone();
        let level = *AlertLevel::ALL.choose(rng)?;
        let message = *ALERT_MESSAGES.choose(rng)?;
        Some(EmergencyAlert::new(sensor_id, message, level, timestamp_ms))
    }
}

/// Periodically synthesize and fan out alerts until shutdown.
pub fn spawn_alert_timer(
    broadcaster: Arc<AlertBroadcaster>,
    interval: Duration,
    seed: u64,
    shutdown: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ticker = tokio::time::interval(interval);
        // The first tick of an interval fires immediately; alerts start
        // one full period after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(alert) = broadcaster.synthesize(&mut rng, unix_millis()) else {
                        continue;
                    };
                    match wire::encode_alert(&alert) {
                        Ok(frame) => {
                            let delivered = broadcaster.broadcast(&frame);
                            info!(
                                "alert [{}] {} '{}' delivered to {} subscribers",
                                alert.level, alert.sensor_id, alert.message, delivered
                            );
                        }
                        Err(e) => warn!("failed to encode alert: {}", e),
                    }
                }
                _ = shutdown.notified() => {
                    debug!("alert timer shutting down");
                    break;
                }
            }
        }
    })
}

/// HTTP/WebSocket front for the alert channel.
pub struct AlertServer {
    broadcaster: Arc<AlertBroadcaster>,
    shutdown: Arc<Notify>,
}

impl AlertServer {
    pub fn new(broadcaster: Arc<AlertBroadcaster>, shutdown: Arc<Notify>) -> Self {
        Self {
            broadcaster,
            shutdown,
        }
    }

    /// Bind `addr` and serve the alert channel until shutdown.
    pub async fn run(&self, addr: SocketAddr) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e))?;
        info!("alert channel on ws://{}{}", addr, wire::ALERTS_PATH);
        self.run_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        let app = Router::new()
            .route(wire::ALERTS_PATH, get(ws_handler))
            .route("/health", get(health_handler))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.broadcaster.clone());

        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await?;

        Ok(())
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(broadcaster): State<Arc<AlertBroadcaster>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

/// Forward broadcast frames to one subscriber until either side fails.
async fn handle_socket(socket: WebSocket, broadcaster: Arc<AlertBroadcaster>) {
    let (id, mut rx) = broadcaster.subscribe();
    info!("alert subscriber {} connected", id);

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(frame) => {
                        if ws_tx.send(Message::Text(frame)).await.is_err() {
                            debug!("alert subscriber {} write failed", id);
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("alert subscriber {} closed", id);
                        break;
                    }
                    // Subscribers send no data frames after the upgrade;
                    // tolerate pings and stray frames.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("alert subscriber {} read error: {}", id, e);
                        break;
                    }
                }
            }
        }
    }

    broadcaster.unsubscribe(id);
    info!("alert subscriber {} disconnected", id);
}

/// Health check endpoint.
async fn health_handler(State(broadcaster): State<Arc<AlertBroadcaster>>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "subscribers": broadcaster.subscriber_count(),
    }))
}
