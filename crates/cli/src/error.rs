// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::snapshot::FetchError;

/// Errors surfaced by the rollcall client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("session is shut down")]
    Shutdown,

    #[error("backend reports status {0:?}")]
    Unhealthy(String),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Core(#[from] rollcall_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
