// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for rollcall-core operations.

use thiserror::Error;

/// All possible errors that can occur in rollcall-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid timestamp: '{0}'\n  hint: expected RFC 3339 or 'YYYY-MM-DD HH:MM:SS'")]
    InvalidTimestamp(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for rollcall-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
