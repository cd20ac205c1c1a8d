// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A connection to one server: three listener tasks bound to one
//! cancellation token.
//!
//! Disconnecting cancels exactly this session's tasks - telemetry
//! receiver, alert receiver and display loop - and joins them before
//! returning, so teardown is deterministic.

use crate::alerts::{self, ReconnectPolicy};
use crate::directory::ServerEntry;
use crate::error::ClientError;
use crate::telemetry;
use crate::view::{self, LocalRegistry, DISPLAY_INTERVAL};
use airmon::wire::CatalogEntry;
use airmon::EventCache;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Live connection to one server.
pub struct Session {
    server_id: String,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    registry: Arc<LocalRegistry>,
}

impl Session {
    /// Bind the telemetry socket and start the three listener tasks.
    ///
    /// A socket bind failure aborts the attempt before anything is
    /// spawned, leaving no partial session behind.
    pub async fn connect(
        entry: &ServerEntry,
        subscribed: Vec<CatalogEntry>,
        events: Arc<EventCache>,
    ) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind(("0.0.0.0", entry.telemetry_port)).await?;

        let registry = Arc::new(LocalRegistry::new());
        let cancel = CancellationToken::new();
        let subscriptions: HashSet<String> =
            subscribed.iter().map(|entry| entry.id.clone()).collect();

        let tasks = vec![
            tokio::spawn(telemetry::run_receiver(
                socket,
                subscriptions,
                registry.clone(),
                events.clone(),
                cancel.clone(),
            )),
            tokio::spawn(alerts::run_receiver(
                entry.alert_url(),
                events,
                ReconnectPolicy::default(),
                cancel.clone(),
            )),
            tokio::spawn(view::run_display_loop(
                registry.clone(),
                subscribed,
                DISPLAY_INTERVAL,
                cancel.clone(),
            )),
        ];

        info!("session started against {}", entry.id);
        Ok(Self {
            server_id: entry.id.clone(),
            cancel,
            tasks,
            registry,
        })
    }

    /// Id of the server this session is connected to.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The session's local sensor mirror.
    pub fn registry(&self) -> &Arc<LocalRegistry> {
        &self.registry
    }

    /// Cancel the session's tasks and wait for all of them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("session task ended abnormally: {}", e);
            }
        }
        info!("session against {} closed", self.server_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_entry() -> ServerEntry {
        ServerEntry {
            id: "server-1".into(),
            address: "127.0.0.1".into(),
            catalog_port: 1,
            // Port 0 binds an ephemeral local port for the receiver.
            telemetry_port: 0,
            alert_port: 1,
        }
    }

    #[tokio::test]
    async fn shutdown_joins_all_tasks_promptly() {
        let session = Session::connect(
            &unreachable_entry(),
            vec![],
            Arc::new(EventCache::default()),
        )
        .await
        .unwrap();

        assert_eq!(session.server_id(), "server-1");
        // The alert receiver is failing to connect and backing off; a
        // shutdown must still complete deterministically.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_secs(5), session.shutdown())
            .await
            .unwrap();
    }
}
