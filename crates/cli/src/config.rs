// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from a TOML file and includes:
//! - `api_url`: Root of the REST API (e.g., `http://localhost:5000/api`)
//! - `push_url`: WebSocket endpoint of the push server
//! - `[reconnect]` and `[health]` tables tuning the background tasks
//!
//! Every key is optional; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::sync::ChannelConfig;

const APP_DIR_NAME: &str = "rollcall";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Client configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// REST API root.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Push server endpoint (`ws://` or `wss://`).
    #[serde(default = "default_push_url")]
    pub push_url: String,
    /// Rows requested from the recent sign-ins endpoint.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,
    /// Maximum number of events held in the live view.
    #[serde(default = "default_view_capacity")]
    pub view_capacity: usize,
    /// Per-request timeout for REST calls in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

/// Push channel reconnection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Consecutive failed handshakes before giving up (default: 5).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds (default: 1000).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Max time for a single handshake in milliseconds (default: 10000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Health check schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds between checks (default: 30).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_push_url() -> String {
    "ws://localhost:5000/ws".to_string()
}

fn default_recent_limit() -> i64 {
    10
}

fn default_view_capacity() -> usize {
    10
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    1_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_interval_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: default_api_url(),
            push_url: default_push_url(),
            recent_limit: default_recent_limit(),
            view_capacity: default_view_capacity(),
            request_timeout_ms: default_request_timeout_ms(),
            reconnect: ReconnectConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from the given file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Resolves the configuration the CLI runs with.
    ///
    /// The file is taken from `flag`, then `ROLLCALL_CONFIG`, then the user
    /// config directory. Only an explicitly named file is required to exist.
    /// URL environment overrides are applied last and the result validated.
    pub fn resolve(flag: Option<&Path>) -> Result<Self> {
        let mut config = match locate(flag, env::config_path(), default_path()) {
            Some(ConfigSource::Explicit(path)) => Self::load(&path)?,
            Some(ConfigSource::Discovered(path)) if path.is_file() => Self::load(&path)?,
            _ => Config::default(),
        };
        config.apply_overrides(env::api_url(), env::push_url());
        config.validate()?;
        Ok(config)
    }

    /// Replaces the URLs with any provided overrides.
    pub fn apply_overrides(&mut self, api_url: Option<String>, push_url: Option<String>) {
        if let Some(url) = api_url {
            self.api_url = url;
        }
        if let Some(url) = push_url {
            self.push_url = url;
        }
    }

    /// Checks every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(invalid(
                "api_url",
                format!("'{}' must be http:// or https://", self.api_url),
            ));
        }
        if !(self.push_url.starts_with("ws://") || self.push_url.starts_with("wss://")) {
            return Err(invalid(
                "push_url",
                format!("'{}' must be ws:// or wss://", self.push_url),
            ));
        }
        if self.recent_limit <= 0 {
            return Err(invalid(
                "recent_limit",
                format!("must be positive, got {}", self.recent_limit),
            ));
        }

        let at_least_one = [
            ("view_capacity", self.view_capacity as u64),
            ("request_timeout_ms", self.request_timeout_ms),
            ("reconnect.max_retries", u64::from(self.reconnect.max_retries)),
            ("reconnect.connect_timeout_ms", self.reconnect.connect_timeout_ms),
            ("health.interval_secs", self.health.interval_secs),
        ];
        for (field, value) in at_least_one {
            if value == 0 {
                return Err(invalid(field, "must be at least 1".to_string()));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health.interval_secs)
    }

    /// Reconnection policy for the push channel.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            max_retries: self.reconnect.max_retries,
            retry_delay: Duration::from_millis(self.reconnect.delay_ms),
            connect_timeout: Duration::from_millis(self.reconnect.connect_timeout_ms),
        }
    }
}

fn invalid(field: &'static str, reason: String) -> Error {
    Error::InvalidConfig { field, reason }
}

/// Where a config file path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by flag or environment; must exist.
    Explicit(PathBuf),
    /// Default location; used only if present.
    Discovered(PathBuf),
}

/// Picks the config file by precedence: flag, environment, default.
pub fn locate(
    flag: Option<&Path>,
    from_env: Option<PathBuf>,
    default: Option<PathBuf>,
) -> Option<ConfigSource> {
    flag.map(Path::to_path_buf)
        .or(from_env)
        .map(ConfigSource::Explicit)
        .or_else(|| default.map(ConfigSource::Discovered))
}

/// `$XDG_CONFIG_HOME/rollcall/config.toml` or the platform equivalent.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
