// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::snapshot::FetchError;
use crate::sync::transport_tests::{MockHub, MockTransport};
use crate::sync::{ChannelConfig, ConnectionState};
use crate::test_helpers::{make_event, make_status, server_error, ScriptedFetcher};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn test_config(capacity: usize) -> Config {
    Config {
        view_capacity: capacity,
        recent_limit: 5,
        ..Config::default()
    }
}

fn start(
    hub: &MockHub,
    fetcher: &Arc<ScriptedFetcher>,
    config: &Config,
) -> LiveSession<MockTransport> {
    let factory_hub = hub.clone();
    let channel_config = ChannelConfig {
        max_retries: 3,
        retry_delay: Duration::from_secs(1),
        connect_timeout: Duration::from_secs(5),
    };
    let channel =
        TransportChannel::with_factory(channel_config, move || factory_hub.transport());
    let dyn_fetcher: Arc<dyn SnapshotFetcher> = fetcher.clone();
    LiveSession::start(config, channel, dyn_fetcher)
}

/// Polls until `cond` holds, advancing paused time in small steps.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(cond(), "condition not reached");
}

fn ids(view: &LiveView) -> Vec<String> {
    view.events.iter().map(|e| e.id.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn start_loads_snapshot_and_connects() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_status(Ok(make_status(2)));
    fetcher.set_recent(Ok(vec![make_event("a", 100), make_event("b", 90)]));

    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.current_view().len() == 2).await;
    wait_until(|| session.channel().is_connected()).await;

    let view = session.current_view();
    assert_eq!(ids(&view), vec!["a", "b"]);
    assert_eq!(view.status.unwrap().signed_count, 2);
    assert_eq!(fetcher.last_limit(), Some(5));
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn signin_broadcast_is_merged() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_recent(Ok(vec![make_event("old", 100)]));

    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.channel().is_connected()).await;
    wait_until(|| session.current_view().len() == 1).await;

    hub.push(
        "new_signin",
        json!({
            "student_name": "Ada",
            "confidence": 0.97,
            "status": "present",
            "timestamp": "2026-03-02T09:00:00Z",
            "message": "Ada signed in",
        }),
    );
    wait_until(|| session.current_view().len() == 2).await;

    let view = session.current_view();
    let latest = view.latest().unwrap();
    assert_eq!(latest.subject_id, "Ada");
    assert_eq!(latest.payload["confidence"], 0.97);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_broadcast_is_applied_once() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.channel().is_connected()).await;

    let signin = json!({"id": "evt-1", "student_name": "Lin", "timestamp": "2026-03-02T09:00:00Z"});
    hub.push("new_signin", signin.clone());
    hub.push("new_signin", signin);
    wait_until(|| session.current_view().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(ids(&session.current_view()), vec!["evt-1"]);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unusable_broadcast_is_ignored() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.channel().is_connected()).await;

    hub.push("new_signin", json!({"student_name": "  ", "timestamp": "2026-03-02T09:00:00Z"}));
    hub.push("new_signin", json!({"student_name": "Ada", "timestamp": "yesterday"}));
    hub.push("new_signin", json!({"student_name": "Lin", "timestamp": "2026-03-02T09:01:00Z"}));
    wait_until(|| session.current_view().len() == 1).await;

    assert_eq!(session.current_view().latest().unwrap().subject_id, "Lin");
    assert!(session.channel().is_connected());
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_previous_view() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_recent(Ok(vec![make_event("a", 100)]));
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.current_view().len() == 1).await;
    let before = session.current_view();

    fetcher.set_status(Err(server_error("database unavailable")));
    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::Status { code: 500, .. })));
    assert_eq!(session.current_view(), before);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_rejects_invalid_limit_without_status_change() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let config = Config {
        recent_limit: 0,
        ..Config::default()
    };
    let session = start(&hub, &fetcher, &config);

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::Validation(_))));
    assert!(session.current_view().status.is_none());
    assert_eq!(fetcher.recent_calls(), 0);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_pulls_a_fresh_snapshot() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.channel().is_connected()).await;
    // Startup refresh plus the one triggered by the first connect.
    wait_until(|| fetcher.status_calls() == 2).await;

    // Missed while offline, then visible through the snapshot.
    fetcher.set_recent(Ok(vec![make_event("missed", 500)]));
    assert!(hub.drop_connection());
    wait_until(|| fetcher.status_calls() == 3).await;
    wait_until(|| session.current_view().len() == 1).await;

    assert_eq!(ids(&session.current_view()), vec!["missed"]);
    assert_eq!(hub.connect_attempts(), 2);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn view_survives_disconnect() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_recent(Ok(vec![make_event("a", 100)]));
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.current_view().len() == 1).await;
    wait_until(|| session.channel().is_connected()).await;

    hub.set_always_fail(true);
    hub.drop_connection();
    wait_until(|| session.channel().state() != ConnectionState::Connected).await;

    assert_eq!(ids(&session.current_view()), vec!["a"]);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_everything() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.channel().is_connected()).await;
    wait_until(|| fetcher.status_calls() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    session.reconciler().on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    session.channel().subscribe("connection-failed", |_| {});

    session.shutdown().await;
    assert!(session.is_shut_down());
    assert_eq!(session.channel().state(), ConnectionState::Disconnected);
    assert_eq!(session.channel().subscription_count(), 0);
    assert!(session.health().is_stopped());

    let health_calls = fetcher.health_calls();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fetcher.health_calls(), health_calls);
    assert_eq!(hub.connect_attempts(), 1);
    assert!(matches!(session.refresh().await, Err(Error::Shutdown)));

    // Handlers registered by callers are gone too.
    assert!(session.reconciler().apply_event(make_event("post", 500)));
    assert_eq!(changes.load(Ordering::SeqCst), 0);

    // Second shutdown is a no-op.
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_in_flight_refresh() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_delay(Duration::from_secs(60));
    fetcher.set_recent(Ok(vec![make_event("late", 100)]));
    let session = start(&hub, &fetcher, &test_config(10));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let started = tokio::time::Instant::now();
    session.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(60));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(session.current_view().is_empty());
}

#[tokio::test(start_paused = true)]
async fn capacity_comes_from_config() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_recent(Ok(vec![
        make_event("a", 100),
        make_event("b", 90),
        make_event("c", 80),
    ]));
    let session = start(&hub, &fetcher, &test_config(2));
    wait_until(|| session.current_view().len() == 2).await;

    assert_eq!(session.reconciler().capacity(), 2);
    assert_eq!(ids(&session.current_view()), vec!["a", "b"]);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn health_is_independent_of_connection() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_health(Err(server_error("database unavailable")));
    let session = start(&hub, &fetcher, &test_config(10));

    wait_until(|| session.channel().is_connected()).await;
    wait_until(|| !session.health().state().is_unchecked()).await;

    let health = session.health().state();
    assert!(!health.healthy);
    assert!(health.last_error.unwrap().contains("database unavailable"));
    assert_eq!(session.channel().state(), ConnectionState::Connected);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn overlapping_refreshes_apply_in_request_order() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.channel().is_connected()).await;
    wait_until(|| fetcher.status_calls() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The first refresh is slow and sees the older summary.
    fetcher.set_delay(Duration::from_secs(5));
    fetcher.set_status(Ok(make_status(1)));
    let first = session.refresh();
    let second = async {
        fetcher.set_delay(Duration::ZERO);
        fetcher.set_status(Ok(make_status(2)));
        session.refresh().await
    };
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    assert_eq!(session.current_view().status.unwrap().signed_count, 2);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn observe_delivers_current_view_immediately() {
    let hub = MockHub::new();
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_recent(Ok(vec![make_event("a", 100)]));
    let session = start(&hub, &fetcher, &test_config(10));
    wait_until(|| session.current_view().len() == 1).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.observe(move |view| sink.lock().unwrap().push(ids(view)));
    assert_eq!(*seen.lock().unwrap(), vec![vec!["a".to_string()]]);

    hub.push(
        "new_signin",
        json!({"id": "b", "student_name": "Lin", "timestamp": "1970-01-01T00:03:20Z"}),
    );
    wait_until(|| seen.lock().unwrap().len() == 2).await;
    assert_eq!(seen.lock().unwrap()[1], vec!["b", "a"]);
    session.shutdown().await;
}
