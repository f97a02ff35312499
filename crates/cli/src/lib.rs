// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rollcall - live-state client for the attendance dashboard.
//!
//! Keeps a bounded, deduplicated, most-recent-first view of sign-in events
//! by merging REST snapshots with a WebSocket push feed.
//!
//! # Main Components
//!
//! - [`TransportChannel`] - push connection with bounded fixed-delay reconnect
//! - [`SnapshotFetcher`] - REST reads ([`HttpFetcher`] in production)
//! - [`HealthMonitor`] - periodic backend liveness probe
//! - [`LiveSession`] - the above wired to a [`StateReconciler`](rollcall_core::StateReconciler)
//!
//! ```rust,ignore
//! use rollcall::{Config, HttpFetcher, LiveSession, TransportChannel};
//!
//! let config = Config::resolve(None)?;
//! let fetcher = Arc::new(HttpFetcher::new(&config.api_url, config.request_timeout())?);
//! let session = LiveSession::start(&config, TransportChannel::new(config.channel_config()), fetcher);
//! session.observe(|view| println!("{} events", view.len()));
//! ```

mod cli;
mod display;

pub mod config;
pub mod env;
pub mod error;
pub mod health;
pub mod session;
pub mod snapshot;
pub mod sync;

#[cfg(test)]
mod test_helpers;

pub use cli::{Cli, Command, OutputFormat};
pub use config::Config;
pub use error::{Error, Result};
pub use health::{HealthMonitor, HealthState};
pub use session::LiveSession;
pub use snapshot::{FetchError, HttpFetcher, RecentLimit, SnapshotFetcher};
pub use sync::{ChannelConfig, ConnectionState, TransportChannel};

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use rollcall_core::protocol::EVENT_CONNECTION_FAILED;

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    let fetcher = HttpFetcher::new(&config.api_url, config.request_timeout())?;

    match cli.command {
        Command::Status { output } => {
            let status = fetcher.fetch_status().await?;
            emit(output, &status, || display::format_status(&status))
        }
        Command::Recent { limit, output } => {
            let events = fetcher
                .fetch_recent(limit.unwrap_or(config.recent_limit))
                .await?;
            emit(output, &events, || {
                events
                    .iter()
                    .map(display::format_event)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Health { output } => {
            let report = fetcher.fetch_health().await?;
            emit(output, &report, || display::format_health_report(&report))?;
            if report.is_healthy() {
                Ok(())
            } else {
                Err(Error::Unhealthy(report.status))
            }
        }
        Command::Watch { output } => watch(&config, Arc::new(fetcher), output).await,
    }
}

/// Prints `value` as pretty JSON or via the text formatter.
fn emit<T: Serialize>(
    output: OutputFormat,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

/// One line per update, for `watch --output json`.
fn emit_line(output: OutputFormat, kind: &str, value: serde_json::Value, text: String) {
    match output {
        OutputFormat::Json => println!("{}", json!({ "type": kind, "data": value })),
        OutputFormat::Text => println!("{text}"),
    }
}

async fn watch(config: &Config, fetcher: Arc<HttpFetcher>, output: OutputFormat) -> Result<()> {
    let channel = TransportChannel::new(config.channel_config());
    channel.subscribe(EVENT_CONNECTION_FAILED, move |data| {
        emit_line(
            output,
            "connection-failed",
            data.clone(),
            format!(
                "push: gave up after {} attempts; showing last known state",
                data["attempts"]
            ),
        );
    });

    let session = LiveSession::start(config, channel, fetcher);
    session.observe(move |view| {
        let value = serde_json::to_value(view).unwrap_or_default();
        emit_line(output, "view", value, display::format_view(view));
    });

    let mut states = session.channel().state_changes();
    let mut health = session.health().subscribe();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            result = &mut interrupted => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                break;
            }
            Ok(()) = states.changed() => {
                let state = *states.borrow_and_update();
                emit_line(
                    output,
                    "connection",
                    json!(state.as_str()),
                    display::format_connection(state),
                );
            }
            Ok(()) = health.changed() => {
                let state = health.borrow_and_update().clone();
                let value = serde_json::to_value(&state).unwrap_or_default();
                emit_line(output, "health", value, display::format_health_state(&state));
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
