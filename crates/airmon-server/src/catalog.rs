// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Catalog discovery responder.
//!
//! Connection-oriented side channel: every accepted TCP session gets the
//! full sensor list exactly once, then the session is closed. Repeated
//! discovery requires a new connection; there is no streaming of updates.

use crate::error::ServerError;
use crate::registry::SensorRegistry;
use airmon::wire;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// How long a session may sit idle before sending its request line.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One-shot catalog server over TCP.
pub struct CatalogServer {
    registry: Arc<SensorRegistry>,
    shutdown: Arc<Notify>,
}

impl CatalogServer {
    pub fn new(registry: Arc<SensorRegistry>, shutdown: Arc<Notify>) -> Self {
        Self { registry, shutdown }
    }

    /// Bind `addr` and serve catalog sessions until shutdown.
    pub async fn run(&self, addr: SocketAddr) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e))?;
        info!("catalog listening on {}", addr);
        self.run_on(listener).await
    }

    /// Serve catalog sessions on an already-bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!("catalog session from {}", peer);
                            let registry = self.registry.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_session(stream, peer, registry).await {
                                    warn!("catalog session {}: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("catalog accept error: {}", e);
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("catalog listener shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Serve one session: read the request line, reply once, close.
///
/// Sessions share nothing but read-only access to the registry; the value
/// snapshot is taken at reply time.
async fn handle_session(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<SensorRegistry>,
) -> Result<(), ServerError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let request = timeout(REQUEST_TIMEOUT, lines.next_line())
        .await
        .map_err(|_| ServerError::RequestTimeout(peer))??;

    match request.as_deref().map(str::trim) {
        Some(wire::DISCOVERY_REQUEST) => {
            let reply = wire::encode_catalog(&registry.catalog_snapshot())?;
            write_half.write_all(reply.as_bytes()).await?;
            write_half.shutdown().await?;
            debug!("served catalog ({} sensors) to {}", registry.len(), peer);
        }
        Some(other) => {
            warn!("unknown request '{}' from {}", other, peer);
        }
        None => {
            debug!("{} closed before sending a request", peer);
        }
    }

    Ok(())
}
