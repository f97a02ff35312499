// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rollcall_core::{AttendanceEvent, EventKind, HealthReport, StatusSummary};

use crate::snapshot::{FetchError, FetchFuture, FetchResult, RecentLimit, SnapshotFetcher};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn make_event(id: &str, secs: i64) -> AttendanceEvent {
    AttendanceEvent::new(id, format!("student-{id}"), at(secs), EventKind::SignIn)
}

pub fn make_status(signed: u32) -> StatusSummary {
    StatusSummary {
        course_name: "Operating Systems".into(),
        course_date: "2026-03-02".into(),
        total_students: 40,
        signed_count: signed,
        absent_count: 40 - signed,
        sign_rate: f64::from(signed) / 40.0 * 100.0,
        avg_confidence: 0.9,
    }
}

pub fn healthy_report() -> HealthReport {
    HealthReport {
        status: "healthy".into(),
        version: "1.0.0".into(),
    }
}

/// In-memory [`SnapshotFetcher`] with scripted responses and call counters.
pub struct ScriptedFetcher {
    health: Mutex<FetchResult<HealthReport>>,
    status: Mutex<FetchResult<StatusSummary>>,
    recent: Mutex<FetchResult<Vec<AttendanceEvent>>>,
    delay: Mutex<Duration>,
    health_calls: AtomicUsize,
    status_calls: AtomicUsize,
    recent_calls: AtomicUsize,
    last_limit: Mutex<Option<u32>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        ScriptedFetcher {
            health: Mutex::new(Ok(healthy_report())),
            status: Mutex::new(Ok(make_status(0))),
            recent: Mutex::new(Ok(Vec::new())),
            delay: Mutex::new(Duration::ZERO),
            health_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            recent_calls: AtomicUsize::new(0),
            last_limit: Mutex::new(None),
        }
    }

    pub fn set_health(&self, result: FetchResult<HealthReport>) {
        *self.health.lock().unwrap() = result;
    }

    pub fn set_status(&self, result: FetchResult<StatusSummary>) {
        *self.status.lock().unwrap() = result;
    }

    pub fn set_recent(&self, result: FetchResult<Vec<AttendanceEvent>>) {
        *self.recent.lock().unwrap() = result;
    }

    /// Delay applied to status and recent fetches.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn recent_calls(&self) -> usize {
        self.recent_calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> Option<u32> {
        *self.last_limit.lock().unwrap()
    }

    fn delay(&self) -> Duration {
        *self.delay.lock().unwrap()
    }
}

pub fn server_error(message: &str) -> FetchError {
    FetchError::Status {
        code: 500,
        message: message.into(),
    }
}

impl SnapshotFetcher for ScriptedFetcher {
    fn fetch_health(&self) -> FetchFuture<'_, HealthReport> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.health.lock().unwrap().clone();
        Box::pin(async move { result })
    }

    fn fetch_status(&self) -> FetchFuture<'_, StatusSummary> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.status.lock().unwrap().clone();
        let delay = self.delay();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn request_recent(&self, limit: RecentLimit) -> FetchFuture<'_, Vec<AttendanceEvent>> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_limit.lock().unwrap() = Some(limit.get());
        let result = self.recent.lock().unwrap().clone();
        let delay = self.delay();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}
