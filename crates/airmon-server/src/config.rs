// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server configuration.

use airmon::SensorSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Telemetry server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the TCP and WebSocket listeners bind to (default: 0.0.0.0).
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// TCP port for catalog discovery (default: 8080).
    #[serde(default = "default_catalog_port")]
    pub catalog_port: u16,

    /// Port for the WebSocket alert channel (default: 8081).
    #[serde(default = "default_alert_port")]
    pub alert_port: u16,

    /// Destination for telemetry datagrams (default: 127.0.0.1:9090).
    ///
    /// Telemetry is push-only: the server sends readings to this pre-known
    /// endpoint, where the client listens.
    #[serde(default = "default_telemetry_target")]
    pub telemetry_target: SocketAddr,

    /// Seconds between generation ticks per sensor (default: 3).
    #[serde(default = "default_generation_interval")]
    pub generation_interval_secs: u64,

    /// Seconds between alert timer ticks (default: 15).
    #[serde(default = "default_alert_interval")]
    pub alert_interval_secs: u64,

    /// Probability that an alert timer tick emits an alert (default: 0.3).
    #[serde(default = "default_alert_probability")]
    pub alert_probability: f64,

    /// RNG seed for reading generation and alert sampling (default: 7).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Sensor set served by this instance. Fixed after startup.
    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorSpec>,
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_catalog_port() -> u16 {
    8080
}

fn default_alert_port() -> u16 {
    8081
}

fn default_telemetry_target() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

fn default_generation_interval() -> u64 {
    3
}

fn default_alert_interval() -> u64 {
    15
}

fn default_alert_probability() -> f64 {
    0.3
}

fn default_seed() -> u64 {
    7
}

fn sensor(id: &str, name: &str, location: &str, unit: &str, min: f64, max: f64) -> SensorSpec {
    SensorSpec {
        id: id.into(),
        name: name.into(),
        location: location.into(),
        unit: unit.into(),
        min,
        max,
    }
}

/// Built-in air-quality sensor set used when no config file is given.
fn default_sensors() -> Vec<SensorSpec> {
    vec![
        sensor("pm25", "PM2.5 particulate", "Riverside district", "µg/m³", 0.0, 500.0),
        sensor("pm10", "PM10 particulate", "Old town", "µg/m³", 0.0, 600.0),
        sensor("co", "Carbon monoxide", "Industrial park", "ppm", 0.0, 50.0),
        sensor("no2", "Nitrogen dioxide", "Central station", "µg/m³", 0.0, 400.0),
        sensor("o3", "Ozone", "Harbour", "µg/m³", 0.0, 300.0),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            catalog_port: default_catalog_port(),
            alert_port: default_alert_port(),
            telemetry_target: default_telemetry_target(),
            generation_interval_secs: default_generation_interval(),
            alert_interval_secs: default_alert_interval(),
            alert_probability: default_alert_probability(),
            seed: default_seed(),
            sensors: default_sensors(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Generation tick interval.
    pub fn generation_interval(&self) -> Duration {
        Duration::from_secs(self.generation_interval_secs)
    }

    /// Alert timer interval.
    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs)
    }

    /// Catalog listener address.
    pub fn catalog_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.catalog_port)
    }

    /// Alert listener address.
    pub fn alert_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.alert_port)
    }

    /// Validate configuration.
    ///
    /// An empty sensor set is legal - the catalog then serves an empty
    /// array and the telemetry channel stays silent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_port == 0 {
            return Err(ConfigError::InvalidValue("catalog_port cannot be 0".into()));
        }
        if self.alert_port == 0 {
            return Err(ConfigError::InvalidValue("alert_port cannot be 0".into()));
        }
        if self.catalog_port == self.alert_port {
            return Err(ConfigError::InvalidValue(
                "catalog_port and alert_port must differ".into(),
            ));
        }
        if self.generation_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "generation_interval_secs cannot be 0".into(),
            ));
        }
        if self.alert_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "alert_interval_secs cannot be 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.alert_probability) {
            return Err(ConfigError::InvalidValue(
                "alert_probability must be within [0, 1]".into(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.sensors {
            if spec.id.is_empty() {
                return Err(ConfigError::InvalidValue("sensor id cannot be empty".into()));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate sensor id '{}'",
                    spec.id
                )));
            }
            if !spec.range_valid() {
                return Err(ConfigError::InvalidValue(format!(
                    "sensor '{}' has an invalid range [{}, {}]",
                    spec.id, spec.min, spec.max
                )));
            }
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}
