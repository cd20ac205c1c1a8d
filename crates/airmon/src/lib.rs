// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AirMon core - shared model and wire protocol for the simulated
//! environmental-telemetry platform.
//!
//! The server (`airmon-server`) publishes synthetic sensor readings and
//! emergency alerts over three channels; the client (`airmon-client`)
//! discovers sensors and aggregates live data. This crate holds everything
//! both sides agree on:
//!
//! - **Model**: sensor definitions and emergency alerts ([`model`])
//! - **Wire**: the JSON shapes exchanged on each channel ([`wire`])
//! - **History**: the bounded FIFO event cache ([`cache`])
//!
//! # Channels
//!
//! | Channel   | Transport | Payload                                  |
//! |-----------|-----------|------------------------------------------|
//! | Catalog   | TCP       | one JSON array of sensors, one line      |
//! | Telemetry | UDP       | one `{id, value, unit}` per datagram     |
//! | Alerts    | WebSocket | `{sensor_id, message, level, timestamp}` |

pub mod cache;
pub mod model;
pub mod wire;

pub use cache::EventCache;
pub use model::{AlertLevel, EmergencyAlert, SensorSpec};
pub use wire::{CatalogEntry, Reading, WireError};
