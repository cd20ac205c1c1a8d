// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Catalog discovery.
//!
//! One connection, one request line, one reply line. Any failure aborts
//! the connect attempt and leaves existing client state untouched.

use crate::directory::ServerEntry;
use crate::error::ClientError;
use airmon::wire::{self, CatalogEntry};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetch the full sensor catalog from a server.
pub async fn fetch_catalog(entry: &ServerEntry) -> Result<Vec<CatalogEntry>, ClientError> {
    let addr = entry.catalog_addr();
    debug!("requesting catalog from {}", addr);

    let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
        .await
        .map_err(|_| ClientError::Timeout(addr.clone()))??;

    let (read_half, mut write_half) = stream.into_split();
    write_half
        .write_all(format!("{}\n", wire::DISCOVERY_REQUEST).as_bytes())
        .await?;

    let mut lines = BufReader::new(read_half).lines();
    let line = timeout(READ_TIMEOUT, lines.next_line())
        .await
        .map_err(|_| ClientError::Timeout(addr.clone()))??
        .ok_or(ClientError::EmptyReply)?;

    let entries = wire::decode_catalog(&line)?;
    debug!("catalog from {}: {} sensors", addr, entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn entry_for(addr: SocketAddr) -> ServerEntry {
        ServerEntry {
            id: "server-1".into(),
            address: addr.ip().to_string(),
            catalog_port: addr.port(),
            telemetry_port: 0,
            alert_port: 0,
        }
    }

    /// Serve one catalog session with a fixed reply line.
    async fn fake_server(reply: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut request = vec![0u8; 64];
            let len = stream.read(&mut request).await.unwrap();
            assert_eq!(&request[..len], b"GET_SENSORS\n");

            stream.write_all(reply.as_bytes()).await.unwrap();
        });

        addr
    }

    #[tokio::test]
    async fn parses_a_catalog_reply() {
        let addr = fake_server(
            r#"[{"id":"pm25","name":"PM2.5 particulate","location":"Riverside district","value":41.5,"unit":"µg/m³"}]"#,
        )
        .await;

        let catalog = fetch_catalog(&entry_for(addr)).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].id, "pm25");
        assert_eq!(catalog[0].value, 41.5);
    }

    #[tokio::test]
    async fn empty_catalog_is_ok() {
        let addr = fake_server("[]\n").await;
        let catalog = fetch_catalog(&entry_for(addr)).await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn malformed_reply_is_a_wire_error() {
        let addr = fake_server("{oops\n").await;
        let result = fetch_catalog(&entry_for(addr)).await;
        assert!(matches!(result, Err(ClientError::Wire(_))));
    }

    #[tokio::test]
    async fn closed_without_reply_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let result = fetch_catalog(&entry_for(addr)).await;
        assert!(matches!(result, Err(ClientError::EmptyReply)));
    }

    #[tokio::test]
    async fn connect_failure_is_an_io_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = fetch_catalog(&entry_for(addr)).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
