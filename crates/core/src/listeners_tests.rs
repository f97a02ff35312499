// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::atomic::AtomicUsize;

fn counter() -> (Arc<AtomicUsize>, impl Fn(&u32) + Send + Sync + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&hits);
    (hits, move |_: &u32| {
        inner.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn emit_reaches_only_matching_topic() {
    let listeners: Listeners<u32> = Listeners::new();
    let (a_hits, a) = counter();
    let (b_hits, b) = counter();
    listeners.add("a", a);
    listeners.add("b", b);

    assert_eq!(listeners.emit("a", &1), 1);
    assert_eq!(a_hits.load(Ordering::SeqCst), 1);
    assert_eq!(b_hits.load(Ordering::SeqCst), 0);
    assert_eq!(listeners.emit("c", &1), 0);
}

#[test]
fn handles_are_unique_and_remove_once() {
    let listeners: Listeners<u32> = Listeners::new();
    let first = listeners.add("a", |_| {});
    let second = listeners.add("a", |_| {});
    assert_ne!(first, second);

    assert!(listeners.remove(first));
    assert!(!listeners.remove(first));
    assert_eq!(listeners.len(), 1);

    assert!(listeners.remove(second));
    assert!(listeners.is_empty());
}

#[test]
fn removed_handler_is_not_called() {
    let listeners: Listeners<u32> = Listeners::new();
    let (hits, handler) = counter();
    let handle = listeners.add("a", handler);
    listeners.emit("a", &1);
    listeners.remove(handle);
    listeners.emit("a", &2);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn handler_may_unsubscribe_itself() {
    let listeners: Arc<Listeners<u32>> = Arc::new(Listeners::new());
    let slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

    let registry = Arc::clone(&listeners);
    let own = Arc::clone(&slot);
    let handle = listeners.add("a", move |_| {
        if let Some(handle) = own.lock().unwrap().take() {
            registry.remove(handle);
        }
    });
    *slot.lock().unwrap() = Some(handle);

    assert_eq!(listeners.emit("a", &1), 1);
    assert!(listeners.is_empty());
}

#[test]
fn clear_reports_count() {
    let listeners: Listeners<u32> = Listeners::new();
    listeners.add("a", |_| {});
    listeners.add("b", |_| {});
    assert_eq!(listeners.clear(), 2);
    assert_eq!(listeners.clear(), 0);
}
