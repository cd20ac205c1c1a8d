// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server error types.

use crate::config::ConfigError;
use airmon::WireError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised by the server roles.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("session from {0} timed out waiting for a request")]
    RequestTimeout(SocketAddr),
}
