// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! State reconciler: the single owner of the [`LiveView`].
//!
//! Snapshots and push events both go through the merge rule in
//! [`crate::merge`], so the view is the same whatever order they arrive in.
//! Change handlers fire exactly once per call that changed the view.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace};

use crate::clock::{ClockSource, SystemClock};
use crate::event::AttendanceEvent;
use crate::listeners::{Listeners, SubscriptionHandle};
use crate::merge::{insert_event, merge_events, same_order};
use crate::status::StatusSummary;
use crate::view::LiveView;

const CHANGE: &str = "change";

/// Merges snapshots and push events into one deduplicated, ordered view.
pub struct StateReconciler<C: ClockSource = SystemClock> {
    capacity: usize,
    clock: C,
    view: Mutex<LiveView>,
    /// Serializes mutate-then-notify so observers see changes in order.
    write: Mutex<()>,
    listeners: Listeners<LiveView>,
}

impl StateReconciler<SystemClock> {
    /// Creates an empty reconciler holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, SystemClock)
    }
}

impl<C: ClockSource> StateReconciler<C> {
    /// Creates an empty reconciler with a custom clock source.
    pub fn with_clock(capacity: usize, clock: C) -> Self {
        StateReconciler {
            capacity,
            clock,
            view: Mutex::new(LiveView::default()),
            write: Mutex::new(()),
            listeners: Listeners::new(),
        }
    }

    /// Maximum number of events kept in the view.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replaces the status summary and merges `events` into the feed.
    ///
    /// Returns true if the observable view changed.
    pub fn apply_snapshot(&self, status: StatusSummary, events: Vec<AttendanceEvent>) -> bool {
        let incoming = events.len();
        let changed = self.commit(|view| {
            let merged = merge_events(&view.events, events, self.capacity);
            let events_changed = !same_order(&view.events, &merged);
            let status_changed = view.status.as_ref() != Some(&status);
            if events_changed {
                view.events = merged;
            }
            if status_changed {
                view.status = Some(status);
            }
            events_changed || status_changed
        });
        debug!(incoming, changed, "applied snapshot");
        changed
    }

    /// Inserts one event. A repeated id is a no-op.
    ///
    /// Returns true if the observable view changed.
    pub fn apply_event(&self, event: AttendanceEvent) -> bool {
        let id = event.id.clone();
        let changed = self.commit(|view| insert_event(&mut view.events, event, self.capacity));
        if changed {
            debug!(%id, "accepted event");
        } else {
            trace!(%id, "event already seen or too old for the feed");
        }
        changed
    }

    /// Returns a copy of the current view.
    pub fn current_view(&self) -> LiveView {
        self.lock_view().clone()
    }

    /// Registers a handler called with the new view after every change.
    ///
    /// Handlers run on the mutating caller's thread and must not call
    /// [`apply_snapshot`](Self::apply_snapshot) or
    /// [`apply_event`](Self::apply_event) themselves.
    pub fn on_change<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&LiveView) + Send + Sync + 'static,
    {
        self.listeners.add(CHANGE, handler)
    }

    /// Removes a change handler. Returns false if it was already removed.
    pub fn remove_listener(&self, handle: SubscriptionHandle) -> bool {
        self.listeners.remove(handle)
    }

    /// Drops every change handler.
    pub fn clear_listeners(&self) -> usize {
        self.listeners.clear()
    }

    fn commit<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut LiveView) -> bool,
    {
        let _write = self.write.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = {
            let mut view = self.lock_view();
            if !mutate(&mut view) {
                return false;
            }
            let now = self.clock.now();
            view.last_updated = Some(view.last_updated.map_or(now, |prev| prev.max(now)));
            view.clone()
        };
        self.listeners.emit(CHANGE, &snapshot);
        true
    }

    fn lock_view(&self) -> MutexGuard<'_, LiveView> {
        self.view.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
