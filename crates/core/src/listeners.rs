// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Topic-keyed handler registry with explicit subscription handles.
//!
//! `add` returns an opaque [`SubscriptionHandle`]; `remove` with that handle
//! is the only way to drop a handler. Handlers run outside the registry lock,
//! so a handler may itself subscribe or unsubscribe.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared handler callback.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Opaque token identifying one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Entry<T: ?Sized> {
    handle: SubscriptionHandle,
    topic: String,
    handler: Handler<T>,
}

/// Registry of handlers grouped by topic.
pub struct Listeners<T: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<T>>>,
}

impl<T: ?Sized> Listeners<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Listeners {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Registers a handler for `topic`.
    pub fn add<F>(&self, topic: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Entry {
            handle,
            topic: topic.to_string(),
            handler: Arc::new(handler),
        });
        handle
    }

    /// Removes the handler behind `handle`. Returns false if it was already gone.
    pub fn remove(&self, handle: SubscriptionHandle) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| e.handle != handle);
        entries.len() != before
    }

    /// Invokes every handler registered for `topic`, in registration order.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, topic: &str, value: &T) -> usize {
        let handlers: Vec<Handler<T>> = self
            .lock()
            .iter()
            .filter(|e| e.topic == topic)
            .map(|e| Arc::clone(&e.handler))
            .collect();
        for handler in &handlers {
            handler(value);
        }
        handlers.len()
    }

    /// Removes every handler. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Number of registered handlers across all topics.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "listeners_tests.rs"]
mod tests;
