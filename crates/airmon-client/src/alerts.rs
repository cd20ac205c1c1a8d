// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Alert receive loop with supervised reconnect.
//!
//! The push channel is read-only after the upgrade: the client never
//! sends data frames. Connection loss triggers bounded exponential
//! backoff instead of silently killing the channel; cancellation wins
//! over any backoff sleep.

use airmon::model::EmergencyAlert;
use airmon::wire;
use airmon::EventCache;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded exponential backoff for the alert channel.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive failed attempts before giving up. The counter resets
    /// on every successful connect.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based): doubles each time,
    /// capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Read alerts until cancelled or the reconnect policy is exhausted.
pub async fn run_receiver(
    url: String,
    events: Arc<EventCache>,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let connect = timeout(CONNECT_TIMEOUT, connect_async(url.as_str()));
        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect => result,
        };

        match connected {
            Ok(Ok((stream, _response))) => {
                info!("alert channel connected to {}", url);
                attempt = 0;
                if !read_frames(stream, &events, &cancel).await {
                    break;
                }
            }
            Ok(Err(e)) => {
                warn!("alert connect to {} failed: {}", url, e);
            }
            Err(_) => {
                warn!("alert connect to {} timed out", url);
            }
        }

        if attempt >= policy.max_attempts {
            error!(
                "alert channel to {} unavailable after {} attempts, giving up",
                url, attempt
            );
            break;
        }

        let delay = policy.delay(attempt);
        attempt += 1;
        debug!("retrying alert channel in {:?} (attempt {})", delay, attempt);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!("alert receiver shutting down");
}

/// Read frames from one connection.
///
/// Returns `false` when cancelled (stop for good), `true` when the
/// connection was lost and a reconnect should be attempted.
async fn read_frames(
    mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &EventCache,
    cancel: &CancellationToken,
) -> bool {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(frame))) => {
                        if let Some(alert) = handle_frame(&frame, events) {
                            println!("{}", render_banner(&alert));
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("alert channel closed by server");
                        return true;
                    }
                    // Pings are answered by tungstenite; anything else on
                    // this channel is unexpected but harmless.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("alert channel read error: {}", e);
                        return true;
                    }
                }
            }
        }
    }
}

/// Decode one frame and record it in the event history.
///
/// Malformed frames are logged and dropped; the connection stays up.
pub fn handle_frame(frame: &str, events: &EventCache) -> Option<EmergencyAlert> {
    match wire::decode_alert(frame) {
        Ok(alert) => {
            events.add(format!(
                "[alert] {}: {} (level: {})",
                alert.sensor_id, alert.message, alert.level
            ));
            Some(alert)
        }
        Err(e) => {
            warn!("dropping malformed alert frame: {}", e);
            None
        }
    }
}

/// Console banner for an incoming alert.
pub fn render_banner(alert: &EmergencyAlert) -> String {
    let when = chrono::DateTime::from_timestamp_millis(alert.timestamp_ms as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{} ms", alert.timestamp_ms));

    format!(
        "\n=== EMERGENCY ALERT ===\nsensor:  {}\nlevel:   {}\nmessage: {}\ntime:    {}\n=======================",
        alert.sensor_id, alert.level, alert.message, when
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use airmon::model::AlertLevel;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            max_attempts: 10,
        };
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        // Capped from here on, including absurd attempt numbers.
        assert_eq!(policy.delay(10), Duration::from_secs(8));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn valid_frame_lands_in_history() {
        let events = EventCache::default();
        let alert = EmergencyAlert::new("co", "Threshold exceeded", AlertLevel::Critical, 1234);
        let frame = wire::encode_alert(&alert).unwrap();

        let decoded = handle_frame(&frame, &events).unwrap();
        assert_eq!(decoded, alert);
        assert_eq!(events.len(), 1);
        let history = events.snapshot();
        assert!(history[0].contains("co"));
        assert!(history[0].contains("critical"));
    }

    #[test]
    fn malformed_frame_is_dropped() {
        let events = EventCache::default();
        assert!(handle_frame("{broken", &events).is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn banner_shows_all_alert_fields() {
        let alert = EmergencyAlert::new("no2", "Reading spiked", AlertLevel::Warning, 0);
        let banner = render_banner(&alert);
        assert!(banner.contains("no2"));
        assert!(banner.contains("warning"));
        assert!(banner.contains("Reading spiked"));
        assert!(banner.contains("1970-01-01"));
    }

    #[tokio::test]
    async fn receiver_gives_up_after_max_attempts() {
        // Bind then drop: connections to this port are refused quickly.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(10),
            max_attempts: 2,
        };
        let events = Arc::new(EventCache::default());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_receiver(
            format!("ws://{}{}", addr, wire::ALERTS_PATH),
            events,
            policy,
            cancel,
        ));
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn cancellation_wins_over_backoff() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
            max_attempts: 100,
        };
        let events = Arc::new(EventCache::default());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_receiver(
            format!("ws://{}{}", addr, wire::ALERTS_PATH),
            events,
            policy,
            cancel.clone(),
        ));

        // Let the first connect fail and the loop park in its backoff.
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
