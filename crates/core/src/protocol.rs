// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire formats for the push channel and the REST boundary.
//!
//! Push frames are JSON text frames of the form
//! `{"event": "<name>", "data": <payload>}` in both directions.
//! REST responses are wrapped in an [`ApiEnvelope`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::{derive_event_id, parse_timestamp, AttendanceEvent, EventId, EventKind};

/// Synthesized locally when the channel completes a handshake.
pub const EVENT_CONNECT: &str = "connect";
/// Synthesized locally when a live connection ends.
pub const EVENT_DISCONNECT: &str = "disconnect";
/// Synthesized locally once reconnection attempts are exhausted.
pub const EVENT_CONNECTION_FAILED: &str = "connection-failed";

/// Broadcast by the server for every recognized sign-in.
pub const EVENT_NEW_SIGNIN: &str = "new_signin";
/// Client heartbeat; the server answers with `pong`.
pub const EVENT_PING: &str = "ping";

/// Returns true for event names only the local channel may emit.
pub fn is_reserved_event(name: &str) -> bool {
    matches!(
        name,
        EVENT_CONNECT | EVENT_DISCONNECT | EVENT_CONNECTION_FAILED
    )
}

/// A named event frame on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PushMessage {
    /// Creates a frame for the given event name and payload.
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        PushMessage {
            event: event.into(),
            data,
        }
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a frame from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Payload of a [`EVENT_NEW_SIGNIN`] broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigninBroadcast {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub student_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default = "default_status")]
    pub status: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SigninBroadcast {
    /// Converts the broadcast into a feed event.
    pub fn into_event(self) -> Result<AttendanceEvent> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let subject = require_subject(&self.student_name)?;
        let id = self
            .id
            .map(EventId::from)
            .unwrap_or_else(|| derive_event_id(subject, &timestamp));
        let subject_id = self
            .student_id
            .unwrap_or_else(|| self.student_name.clone());
        let payload = serde_json::json!({
            "name": self.student_name,
            "status": self.status,
            "confidence": self.confidence,
            "message": self.message,
        });
        Ok(AttendanceEvent::new(id, subject_id, timestamp, EventKind::SignIn).with_payload(payload))
    }
}

/// One row of the recent sign-ins list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigninRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub confidence: f64,
    pub time: String,
    #[serde(default)]
    pub remark: String,
}

impl SigninRecord {
    /// Converts the row into a feed event.
    pub fn into_event(self) -> Result<AttendanceEvent> {
        let timestamp = parse_timestamp(&self.time)?;
        let subject = require_subject(&self.name)?;
        let id = self
            .id
            .map(EventId::from)
            .unwrap_or_else(|| derive_event_id(subject, &timestamp));
        let subject_id = self.student_id.unwrap_or_else(|| self.name.clone());
        let payload = serde_json::json!({
            "name": self.name,
            "status": self.status,
            "confidence": self.confidence,
            "remark": self.remark,
        });
        Ok(AttendanceEvent::new(id, subject_id, timestamp, EventKind::SignIn).with_payload(payload))
    }
}

/// `data` body of the recent sign-ins endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentRecords {
    #[serde(default)]
    pub records: Vec<SigninRecord>,
}

/// Uniform response wrapper used by every REST endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

fn default_status() -> String {
    "present".to_string()
}

fn require_subject(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("sign-in is missing a student name".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
