// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The consumer-facing reconciled state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{AttendanceEvent, EventId};
use crate::status::StatusSummary;

/// Reconciled view of the live feed.
///
/// `events` holds no duplicate ids, is ordered most-recent-first and never
/// exceeds the reconciler's capacity. Consumers only ever see clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveView {
    pub status: Option<StatusSummary>,
    pub events: Vec<AttendanceEvent>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl LiveView {
    /// Number of events in the feed.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the feed holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns true if an event with `id` is in the feed.
    pub fn contains(&self, id: &EventId) -> bool {
        self.events.iter().any(|e| &e.id == id)
    }

    /// The most recent event, if any.
    pub fn latest(&self) -> Option<&AttendanceEvent> {
        self.events.first()
    }
}
