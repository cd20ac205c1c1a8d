// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sensor definitions and emergency alerts.

use serde::{Deserialize, Serialize};

/// Static definition of a measurement source.
///
/// `min`/`max` bound the values the server may generate for this sensor.
/// They are configuration-side only and never appear on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    /// Unique, stable identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Where the sensor is installed.
    pub location: String,

    /// Unit of measurement (e.g. "µg/m³", "ppm").
    pub unit: String,

    /// Lower bound of generated values.
    pub min: f64,

    /// Upper bound of generated values.
    pub max: f64,
}

impl SensorSpec {
    /// Check that the generation range is well-formed.
    pub fn range_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Advisory,
    Warning,
    Critical,
}

impl AlertLevel {
    /// All severities, for uniform sampling.
    pub const ALL: [AlertLevel; 3] = [
        AlertLevel::Advisory,
        AlertLevel::Warning,
        AlertLevel::Critical,
    ];

    /// Wire token for this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Advisory => "advisory",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An out-of-band emergency notification.
///
/// Immutable once created; broadcast to all alert subscribers, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    /// Sensor this alert refers to. Must be a known id at generation time.
    pub sensor_id: String,

    /// Alert text.
    pub message: String,

    /// Severity.
    pub level: AlertLevel,

    /// Generation instant, milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

impl EmergencyAlert {
    /// Create an alert stamped with the given instant.
    pub fn new(
        sensor_id: impl Into<String>,
        message: impl Into<String>,
        level: AlertLevel,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            message: message.into(),
            level,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tokens_are_lowercase() {
        for level in AlertLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
    }

    #[test]
    fn level_round_trip() {
        let parsed: AlertLevel = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, AlertLevel::Critical);
    }

    #[test]
    fn alert_wire_field_names() {
        let alert = EmergencyAlert::new("pm25", "threshold exceeded", AlertLevel::Warning, 1234);
        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"sensor_id\":\"pm25\""));
        assert!(json.contains("\"timestamp\":1234"));
        assert!(!json.contains("timestamp_ms"));
    }

    #[test]
    fn range_validation() {
        let mut spec = SensorSpec {
            id: "s".into(),
            name: "S".into(),
            location: "L".into(),
            unit: "u".into(),
            min: 0.0,
            max: 10.0,
        };
        assert!(spec.range_valid());

        spec.min = 10.0;
        assert!(!spec.range_valid());

        spec.min = f64::NAN;
        assert!(!spec.range_valid());
    }
}
