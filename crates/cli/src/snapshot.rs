// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time reads of the attendance backend over REST.
//!
//! Every response is wrapped in a `{success, message, data}` envelope. The
//! fetcher keeps no state between calls and never retries.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use rollcall_core::protocol::{ApiEnvelope, RecentRecords};
use rollcall_core::{AttendanceEvent, HealthReport, StatusSummary};

/// Errors from a snapshot fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("server returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0} ms")]
    Timeout(u128),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    /// HTTP status code, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = FetchResult<T>> + Send + 'a>>;

/// Positive row count for the recent-events query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentLimit(u32);

impl RecentLimit {
    pub fn new(limit: i64) -> FetchResult<Self> {
        if limit <= 0 {
            return Err(FetchError::Validation(format!(
                "limit must be positive, got {limit}"
            )));
        }
        u32::try_from(limit)
            .map(RecentLimit)
            .map_err(|_| FetchError::Validation(format!("limit {limit} is too large")))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Source of REST snapshots.
pub trait SnapshotFetcher: Send + Sync {
    /// `GET /health`
    fn fetch_health(&self) -> FetchFuture<'_, HealthReport>;

    /// `GET /realtime/status`
    fn fetch_status(&self) -> FetchFuture<'_, StatusSummary>;

    /// `GET /realtime/recent?limit=N`
    fn request_recent(&self, limit: RecentLimit) -> FetchFuture<'_, Vec<AttendanceEvent>>;

    /// Validates `limit` before any request is made.
    fn fetch_recent(&self, limit: i64) -> FetchFuture<'_, Vec<AttendanceEvent>> {
        match RecentLimit::new(limit) {
            Ok(limit) => self.request_recent(limit),
            Err(e) => Box::pin(async move { Err(e) }),
        }
    }
}

/// [`SnapshotFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: &str, timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(HttpFetcher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, u32)],
    ) -> FetchResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "fetching snapshot");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .map(|env| env.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(FetchError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(FetchError::Status {
                code: status.as_u16(),
                message: envelope.message,
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| FetchError::Decode(format!("{path}: response has no data")))?;
        serde_json::from_value(data).map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

impl SnapshotFetcher for HttpFetcher {
    fn fetch_health(&self) -> FetchFuture<'_, HealthReport> {
        Box::pin(self.get("/health", &[]))
    }

    fn fetch_status(&self) -> FetchFuture<'_, StatusSummary> {
        Box::pin(self.get("/realtime/status", &[]))
    }

    fn request_recent(&self, limit: RecentLimit) -> FetchFuture<'_, Vec<AttendanceEvent>> {
        Box::pin(async move {
            let recent: RecentRecords = self
                .get("/realtime/recent", &[("limit", limit.get())])
                .await?;
            Ok(records_to_events(recent))
        })
    }
}

/// Converts wire records, skipping rows that cannot form an event.
fn records_to_events(recent: RecentRecords) -> Vec<AttendanceEvent> {
    recent
        .records
        .into_iter()
        .filter_map(|record| match record.into_event() {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "skipping unusable attendance record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
