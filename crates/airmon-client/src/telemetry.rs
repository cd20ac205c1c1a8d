// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry receive loop.
//!
//! One datagram socket for the session lifetime. Malformed datagrams and
//! readings for non-subscribed sensors never terminate the loop; only
//! cancellation does. This loop is the sole writer of registry entries.

use crate::view::LocalRegistry;
use airmon::wire;
use airmon::EventCache;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receive readings until cancelled.
pub async fn run_receiver(
    socket: UdpSocket,
    subscriptions: HashSet<String>,
    registry: Arc<LocalRegistry>,
    events: Arc<EventCache>,
    cancel: CancellationToken,
) {
    if let Ok(addr) = socket.local_addr() {
        info!("telemetry listener on {}", addr);
    }

    let mut buf = vec![0u8; 2048];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("telemetry receiver shutting down");
                break;
            }
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, _)) => {
                        handle_datagram(&buf[..len], &subscriptions, &registry, &events).await;
                    }
                    Err(e) => {
                        warn!("telemetry receive error: {}", e);
                    }
                }
            }
        }
    }
}

/// Decode one datagram and apply the subscription filter.
async fn handle_datagram(
    datagram: &[u8],
    subscriptions: &HashSet<String>,
    registry: &LocalRegistry,
    events: &EventCache,
) {
    let reading = match wire::decode_reading(datagram) {
        Ok(reading) => reading,
        Err(e) => {
            warn!("dropping malformed telemetry datagram: {}", e);
            return;
        }
    };

    // Readings for sensors outside the allow-list are dropped silently.
    if !subscriptions.contains(&reading.id) {
        return;
    }

    events.add(format!(
        "[udp] {} = {:.2} {}",
        reading.id, reading.value, reading.unit
    ));
    registry.update(reading).await;
}
