// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live session: the push channel, snapshot fetcher, reconciler and health
//! monitor wired together.
//!
//! Sign-in broadcasts go straight into the reconciler. Every time the channel
//! (re)connects a REST snapshot is pulled, which recovers events broadcast
//! while the client was offline since the push server does not replay.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rollcall_core::protocol::{SigninBroadcast, EVENT_CONNECT, EVENT_NEW_SIGNIN};
use rollcall_core::{LiveView, StateReconciler, SubscriptionHandle};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::health::HealthMonitor;
use crate::snapshot::SnapshotFetcher;
use crate::sync::{Transport, TransportChannel, WebSocketTransport};

struct Inner {
    reconciler: StateReconciler,
    fetcher: Arc<dyn SnapshotFetcher>,
    recent_limit: i64,
    cancel: CancellationToken,
    refreshes: Mutex<JoinSet<()>>,
    /// Held from fetch through apply so snapshots land in request order.
    serial: AsyncMutex<()>,
}

impl Inner {
    async fn refresh(&self) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(Error::Shutdown);
        }
        let fetch_and_apply = async {
            let _serial = self.serial.lock().await;
            let (status, events) = tokio::try_join!(
                self.fetcher.fetch_status(),
                self.fetcher.fetch_recent(self.recent_limit),
            )?;
            Ok::<_, Error>(self.reconciler.apply_snapshot(status, events))
        };
        let changed = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Shutdown),
            result = fetch_and_apply => result?,
        };
        debug!(changed, "snapshot applied");
        Ok(changed)
    }

    /// Runs a refresh in the background, logging failures.
    fn spawn_refresh(self: &Arc<Self>, reason: &'static str) {
        if self.cancel.is_cancelled() {
            return;
        }
        let inner = Arc::clone(self);
        let mut refreshes = self.lock_refreshes();
        while refreshes.try_join_next().is_some() {}
        refreshes.spawn(async move {
            match inner.refresh().await {
                Ok(_) | Err(Error::Shutdown) => {}
                Err(e) => warn!(reason, error = %e, "snapshot refresh failed, keeping previous view"),
            }
        });
    }

    fn lock_refreshes(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.refreshes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A running live-state client.
pub struct LiveSession<T: Transport + 'static = WebSocketTransport> {
    inner: Arc<Inner>,
    channel: TransportChannel<T>,
    health: HealthMonitor,
}

impl<T: Transport + 'static> LiveSession<T> {
    /// Wires everything up and starts the background work.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &Config,
        channel: TransportChannel<T>,
        fetcher: Arc<dyn SnapshotFetcher>,
    ) -> Self {
        let inner = Arc::new(Inner {
            reconciler: StateReconciler::new(config.view_capacity),
            fetcher: Arc::clone(&fetcher),
            recent_limit: config.recent_limit,
            cancel: CancellationToken::new(),
            refreshes: Mutex::new(JoinSet::new()),
            serial: AsyncMutex::new(()),
        });

        {
            let inner = Arc::clone(&inner);
            channel.subscribe_typed(EVENT_NEW_SIGNIN, move |msg: SigninBroadcast| {
                match msg.into_event() {
                    Ok(event) => {
                        let id = event.id.clone();
                        if inner.reconciler.apply_event(event) {
                            debug!(%id, "sign-in applied");
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring unusable sign-in broadcast"),
                }
            });
        }
        {
            let inner = Arc::clone(&inner);
            channel.subscribe(EVENT_CONNECT, move |_| inner.spawn_refresh("reconnect"));
        }

        let health = HealthMonitor::spawn(fetcher, config.health_interval());

        info!(api = %config.api_url, push = %config.push_url, "starting live session");
        channel.connect(&config.push_url);
        inner.spawn_refresh("startup");

        LiveSession {
            inner,
            channel,
            health,
        }
    }

    /// Pulls a fresh snapshot and merges it into the view.
    ///
    /// On failure the view is left as it was. Returns whether the view
    /// changed.
    pub async fn refresh(&self) -> Result<bool> {
        self.inner.refresh().await
    }

    pub fn reconciler(&self) -> &StateReconciler {
        &self.inner.reconciler
    }

    pub fn current_view(&self) -> LiveView {
        self.inner.reconciler.current_view()
    }

    /// Registers a change handler and immediately calls it with the current
    /// view, so a snapshot that landed before registration is not missed.
    ///
    /// The handler may see the same view twice if a change races the
    /// registration.
    pub fn observe<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&LiveView) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let registered = Arc::clone(&handler);
        let handle = self
            .inner
            .reconciler
            .on_change(move |view| registered(view));
        handler(&self.current_view());
        handle
    }

    pub fn channel(&self) -> &TransportChannel<T> {
        &self.channel
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Stops all background work and drops every channel subscription and
    /// change handler, including ones registered by callers. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.channel.unsubscribe_all();
        self.inner.reconciler.clear_listeners();

        self.channel.disconnect().await;
        self.health.stop().await;

        let mut refreshes = std::mem::take(&mut *self.inner.lock_refreshes());
        while refreshes.join_next().await.is_some() {}
        info!("live session stopped");
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
