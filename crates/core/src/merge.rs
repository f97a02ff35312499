// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Merge rule for the live feed.
//!
//! Union by id, sort by `(timestamp, id)` descending, truncate to capacity.
//! - Duplicate id: the event already held wins (first write wins)
//! - Evicted events stay evicted while the slots ahead of them are taken
//!
//! The rule is idempotent and commutative: any interleaving of the same
//! events yields the same feed.

use std::collections::HashSet;

use crate::event::{recency_cmp, AttendanceEvent, EventId};

/// Merges `incoming` into `current` and returns the new feed.
///
/// `current` must already satisfy the feed invariants.
pub fn merge_events<I>(current: &[AttendanceEvent], incoming: I, capacity: usize) -> Vec<AttendanceEvent>
where
    I: IntoIterator<Item = AttendanceEvent>,
{
    let mut seen: HashSet<EventId> = current.iter().map(|e| e.id.clone()).collect();
    let mut merged: Vec<AttendanceEvent> = current.to_vec();
    for event in incoming {
        if seen.insert(event.id.clone()) {
            merged.push(event);
        }
    }
    merged.sort_by(recency_cmp);
    merged.truncate(capacity);
    merged
}

/// Inserts one event in place.
///
/// Produces exactly what [`merge_events`] would for a single event, without
/// re-sorting. Returns false when the feed is unchanged: the id is already
/// present, or the event would land beyond capacity.
pub fn insert_event(events: &mut Vec<AttendanceEvent>, event: AttendanceEvent, capacity: usize) -> bool {
    if events.iter().any(|e| e.id == event.id) {
        return false;
    }
    let position = events.partition_point(|e| recency_cmp(e, &event).is_lt());
    if position >= capacity {
        return false;
    }
    events.insert(position, event);
    events.truncate(capacity);
    true
}

/// Returns true if both feeds hold the same ids in the same order.
pub fn same_order(a: &[AttendanceEvent], b: &[AttendanceEvent]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
