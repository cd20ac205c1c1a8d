// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client error types.

use airmon::WireError;
use thiserror::Error;

/// Errors raised by the client components.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("timed out talking to {0}")]
    Timeout(String),

    #[error("server closed the session without a catalog reply")]
    EmptyReply,

    #[error("server '{0}' not found")]
    UnknownServer(String),
}
