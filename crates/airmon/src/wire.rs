// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire protocol for the three publication channels.
//!
//! Everything on the wire is JSON. The catalog travels as a single
//! newline-terminated array over TCP, readings as one object per UDP
//! datagram, alerts as discrete WebSocket text frames.

use crate::model::EmergencyAlert;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed discovery request line (without the trailing newline).
pub const DISCOVERY_REQUEST: &str = "GET_SENSORS";

/// WebSocket path the alert channel is served on.
pub const ALERTS_PATH: &str = "/alerts";

/// Decode failures for inbound messages.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
}

/// One sensor reading as carried by a telemetry datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub value: f64,
    pub unit: String,
}

/// One sensor as listed in the catalog reply.
///
/// Carries the latest value at snapshot time. Generation bounds and any
/// server-internal state are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub location: String,
    pub value: f64,
    pub unit: String,
}

/// Encode a catalog reply: one JSON array, newline-terminated.
pub fn encode_catalog(entries: &[CatalogEntry]) -> Result<String, WireError> {
    let mut line = serde_json::to_string(entries)?;
    line.push('\n');
    Ok(line)
}

/// Decode a catalog reply line.
pub fn decode_catalog(line: &str) -> Result<Vec<CatalogEntry>, WireError> {
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Encode a reading for a single telemetry datagram.
pub fn encode_reading(reading: &Reading) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(reading)?)
}

/// Decode one telemetry datagram.
pub fn decode_reading(datagram: &[u8]) -> Result<Reading, WireError> {
    let text = std::str::from_utf8(datagram)?;
    Ok(serde_json::from_str(text)?)
}

/// Encode an alert for a single WebSocket text frame.
pub fn encode_alert(alert: &EmergencyAlert) -> Result<String, WireError> {
    Ok(serde_json::to_string(alert)?)
}

/// Decode one alert frame.
pub fn decode_alert(frame: &str) -> Result<EmergencyAlert, WireError> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlertLevel;

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            name: format!("Sensor {id}"),
            location: "Riverside".into(),
            value: 12.5,
            unit: "ppm".into(),
        }
    }

    #[test]
    fn catalog_round_trip() {
        let entries = vec![entry("pm25"), entry("co")];
        let line = encode_catalog(&entries).unwrap();
        assert!(line.ends_with('\n'));

        let decoded = decode_catalog(&line).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn empty_catalog_is_an_empty_array() {
        let line = encode_catalog(&[]).unwrap();
        assert_eq!(line, "[]\n");
        assert!(decode_catalog(&line).unwrap().is_empty());
    }

    #[test]
    fn catalog_never_exposes_generation_bounds() {
        let line = encode_catalog(&[entry("pm25")]).unwrap();
        assert!(!line.contains("\"min\""));
        assert!(!line.contains("\"max\""));
    }

    #[test]
    fn reading_round_trip() {
        let reading = Reading {
            id: "no2".into(),
            value: 41.7,
            unit: "µg/m³".into(),
        };
        let bytes = encode_reading(&reading).unwrap();
        assert_eq!(decode_reading(&bytes).unwrap(), reading);
    }

    #[test]
    fn reading_rejects_malformed_datagrams() {
        assert!(decode_reading(b"{not json").is_err());
        assert!(decode_reading(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn alert_round_trip() {
        let alert = EmergencyAlert::new("co", "CO spike detected", AlertLevel::Critical, 99);
        let frame = encode_alert(&alert).unwrap();
        assert_eq!(decode_alert(&frame).unwrap(), alert);
    }
}
