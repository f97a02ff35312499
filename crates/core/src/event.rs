// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Attendance events: the unit of the live feed.
//!
//! An event is immutable once received. Its identity is [`EventId`]; two
//! events with the same id are the same logical event no matter whether they
//! arrived in a snapshot or over the push channel.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// Naive timestamp layouts emitted by the attendance server (no offset, UTC assumed).
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Opaque unique identifier of an attendance event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates an event id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        EventId(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId::new(s)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        EventId(s)
    }
}

/// What happened to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Subject was recognized and signed in.
    SignIn,
    /// Subject signed out.
    SignOut,
    /// Attendance alert (late arrival, low confidence, ...).
    Alert,
    /// Any kind this client does not know about.
    #[serde(other)]
    Other,
}

impl EventKind {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SignIn => "sign-in",
            EventKind::SignOut => "sign-out",
            EventKind::Alert => "alert",
            EventKind::Other => "other",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single attendance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: EventId,
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Free-form details carried alongside the event (confidence, status, remark).
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl AttendanceEvent {
    /// Creates an event with an empty payload.
    pub fn new(
        id: impl Into<EventId>,
        subject_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        kind: EventKind,
    ) -> Self {
        AttendanceEvent {
            id: id.into(),
            subject_id: subject_id.into(),
            timestamp,
            kind,
            payload: serde_json::Value::Null,
        }
    }

    /// Attaches a payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Feed ordering: most recent first, ties broken by id (descending).
pub fn recency_cmp(a: &AttendanceEvent, b: &AttendanceEvent) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.id.cmp(&a.id))
}

/// Builds a stable id for wire records that carry none.
///
/// Both the recent-list rows and the push broadcasts derive from the same
/// subject name and timestamp, so one sign-in seen through both paths maps
/// to a single identity. Stored rows only keep whole seconds while
/// broadcasts carry microseconds, so the fraction is dropped.
pub fn derive_event_id(subject: &str, timestamp: &DateTime<Utc>) -> EventId {
    EventId(format!(
        "{subject}@{}",
        timestamp
            .trunc_subsecs(0)
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    ))
}

/// Parses a server timestamp.
///
/// Accepts RFC 3339 and the naive ISO layouts the server emits; naive values
/// are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
