// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `ROLLCALL_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    non_empty(vars::ROLLCALL_CONFIG).map(PathBuf::from)
}

/// Returns the value of `ROLLCALL_API_URL` if set and non-empty.
pub fn api_url() -> Option<String> {
    non_empty(vars::ROLLCALL_API_URL)
}

/// Returns the value of `ROLLCALL_PUSH_URL` if set and non-empty.
pub fn push_url() -> Option<String> {
    non_empty(vars::ROLLCALL_PUSH_URL)
}

/// Returns `true` if `RUST_LOG` is set (any value).
pub fn log_filter_set() -> bool {
    std::env::var(vars::RUST_LOG).is_ok()
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
