// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic backend liveness probe.
//!
//! Runs independently of the push channel: a healthy REST backend with a
//! dead push connection (or the reverse) is reported as-is.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rollcall_core::{ClockSource, SystemClock};

use crate::snapshot::SnapshotFetcher;

/// Outcome of the most recent health check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthState {
    pub healthy: bool,
    /// Backend version reported by the last successful check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl HealthState {
    /// True until the first check completes.
    pub fn is_unchecked(&self) -> bool {
        self.last_checked.is_none()
    }
}

struct Probe {
    fetcher: Arc<dyn SnapshotFetcher>,
    clock: Box<dyn ClockSource>,
    state: watch::Sender<HealthState>,
}

impl Probe {
    async fn check(&self) -> HealthState {
        let checked_at = self.clock.now();
        let next = match self.fetcher.fetch_health().await {
            Ok(report) if report.is_healthy() => HealthState {
                healthy: true,
                version: Some(report.version),
                last_checked: Some(checked_at),
                last_error: None,
            },
            Ok(report) => HealthState {
                healthy: false,
                version: Some(report.version),
                last_checked: Some(checked_at),
                last_error: Some(format!("backend reports status {:?}", report.status)),
            },
            Err(e) => HealthState {
                healthy: false,
                version: None,
                last_checked: Some(checked_at),
                last_error: Some(e.to_string()),
            },
        };

        let was_healthy = self.state.borrow().healthy;
        match (&next.last_error, was_healthy, next.healthy) {
            (Some(cause), _, false) => warn!(%cause, "backend health check failed"),
            (None, false, true) => info!(version = ?next.version, "backend healthy"),
            _ => debug!(healthy = next.healthy, "backend health check"),
        }

        self.state.send_replace(next.clone());
        next
    }
}

/// Background health checker on a fixed interval.
///
/// The first check runs immediately; later ticks that fall behind are
/// delayed rather than bunched up. Dropping the monitor stops it.
pub struct HealthMonitor {
    probe: Arc<Probe>,
    interval: Duration,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Start checking with the system clock.
    pub fn spawn(fetcher: Arc<dyn SnapshotFetcher>, interval: Duration) -> Self {
        Self::spawn_with_clock(fetcher, interval, SystemClock)
    }

    /// Start checking with a custom clock (for testing).
    pub fn spawn_with_clock<C>(
        fetcher: Arc<dyn SnapshotFetcher>,
        interval: Duration,
        clock: C,
    ) -> Self
    where
        C: ClockSource + 'static,
    {
        let (state, _) = watch::channel(HealthState::default());
        let probe = Arc::new(Probe {
            fetcher,
            clock: Box::new(clock),
            state,
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(Arc::clone(&probe), interval, cancel.clone()));
        HealthMonitor {
            probe,
            interval,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latest state. Unhealthy and unchecked before the first check.
    pub fn state(&self) -> HealthState {
        self.probe.state.borrow().clone()
    }

    /// Receiver notified after every check.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.probe.state.subscribe()
    }

    /// Run a check right away, outside the schedule.
    pub async fn check_now(&self) -> HealthState {
        self.probe.check().await
    }

    /// Stop the schedule and wait for the task to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "health monitor ended abnormally");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(probe: Arc<Probe>, interval: Duration, cancel: CancellationToken) {
    let schedule = async {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            probe.check().await;
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => debug!("health monitor stopped"),
        _ = schedule => {}
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
