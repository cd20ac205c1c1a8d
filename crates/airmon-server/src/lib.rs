// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AirMon telemetry server.
//!
//! Publishes synthetic environmental readings and emergency alerts over
//! three concurrent channels:
//!
//! - **Catalog** (TCP): one-shot discovery - each session gets the full
//!   sensor list as a single JSON line, then the session closes.
//! - **Telemetry** (UDP): every sensor draws a fresh value on a fixed
//!   interval and pushes it as one best-effort datagram.
//! - **Alerts** (WebSocket): randomly synthesized emergency alerts fanned
//!   out to every subscribed connection on `/alerts`.
//!
//! The sensor set is fixed at startup; only per-sensor values change
//! afterwards.

pub mod alerts;
pub mod catalog;
pub mod config;
pub mod error;
pub mod registry;
pub mod telemetry;

pub use alerts::{AlertBroadcaster, AlertServer};
pub use catalog::CatalogServer;
pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use registry::{SensorCell, SensorRegistry};
pub use telemetry::TelemetryPublisher;
