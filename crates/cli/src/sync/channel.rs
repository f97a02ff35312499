// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent push channel with bounded, fixed-delay reconnection.
//!
//! One background driver task owns the transport, so there is never more
//! than one socket per channel and reconnection attempts are strictly
//! sequential. State machine:
//!
//! ```text
//!                connect()
//! Disconnected ───────────► Connecting ──handshake ok──► Connected
//!      ▲  ▲                   │    ▲                        │
//!      │  └── retries spent ──┘    └── retry_delay ─────────┤ drop
//!      │      (connection-failed)                           │
//!      └──────────────── disconnect() from any state ◄──────┘
//! ```
//!
//! Transitions are published on a `watch` channel. The reserved events
//! `connect`, `disconnect` and `connection-failed` are synthesized here and
//! delivered through the same subscription registry as server events.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use rollcall_core::protocol::{
    is_reserved_event, EVENT_CONNECT, EVENT_CONNECTION_FAILED, EVENT_DISCONNECT, EVENT_PING,
};
use rollcall_core::{Listeners, PushMessage, SubscriptionHandle};

use super::transport::{Transport, TransportError, WebSocketTransport};

/// State of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Connected to the push server.
    Connected,
}

impl ConnectionState {
    /// Returns the string representation used in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconnection policy for the channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Consecutive handshake failures tolerated before giving up.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Upper bound on a single handshake.
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Builds a fresh transport for each connection attempt.
pub type TransportFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// State shared between the channel handle and its driver task.
struct Shared {
    state: watch::Sender<ConnectionState>,
    listeners: Listeners<Value>,
    outbound: Mutex<Option<mpsc::UnboundedSender<PushMessage>>>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "connection state");
            *current = next;
            true
        });
    }

    fn set_outbound(&self, tx: Option<mpsc::UnboundedSender<PushMessage>>) {
        *self.lock_outbound() = tx;
    }

    fn lock_outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<PushMessage>>> {
        self.outbound.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle on a running driver task.
struct Driver {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Push channel with typed publish/subscribe over named events.
pub struct TransportChannel<T: Transport + 'static = WebSocketTransport> {
    config: ChannelConfig,
    factory: TransportFactory<T>,
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl TransportChannel<WebSocketTransport> {
    /// Create a channel backed by WebSocket transports.
    pub fn new(config: ChannelConfig) -> Self {
        Self::with_factory(config, WebSocketTransport::new)
    }
}

impl<T: Transport + 'static> TransportChannel<T> {
    /// Create a channel with a custom transport factory (for testing).
    pub fn with_factory<F>(config: ChannelConfig, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        TransportChannel {
            config,
            factory: Arc::new(factory),
            shared: Arc::new(Shared {
                state,
                listeners: Listeners::new(),
                outbound: Mutex::new(None),
            }),
            driver: Mutex::new(None),
        }
    }

    /// The reconnection policy in use.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Start connecting to `endpoint`.
    ///
    /// Must be called from within a tokio runtime. Does nothing if the
    /// channel is already connecting or connected.
    pub fn connect(&self, endpoint: &str) {
        let mut driver = self.lock_driver();
        if driver.as_ref().is_some_and(|d| !d.task.is_finished()) {
            debug!(endpoint, "connect ignored: channel already active");
            return;
        }

        self.shared.set_state(ConnectionState::Connecting);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_driver(
            endpoint.to_string(),
            self.config.clone(),
            Arc::clone(&self.factory),
            Arc::clone(&self.shared),
            cancel.clone(),
        ));
        *driver = Some(Driver { cancel, task });
    }

    /// Close the connection and cancel any pending retry.
    ///
    /// Idempotent. Does not reconnect afterwards.
    pub async fn disconnect(&self) {
        let driver = self.lock_driver().take();
        if let Some(driver) = driver {
            driver.cancel.cancel();
            if let Err(e) = driver.task.await {
                warn!(error = %e, "channel driver ended abnormally");
            }
        }
        self.shared.set_outbound(None);
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Register a handler for a named event. Payloads arrive as raw JSON.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared.listeners.add(event, handler)
    }

    /// Register a handler that receives the payload decoded as `M`.
    ///
    /// Payloads that fail to decode are logged and skipped.
    pub fn subscribe_typed<M, F>(&self, event: &str, handler: F) -> SubscriptionHandle
    where
        M: DeserializeOwned + 'static,
        F: Fn(M) + Send + Sync + 'static,
    {
        let name = event.to_string();
        self.subscribe(event, move |data| {
            match serde_json::from_value::<M>(data.clone()) {
                Ok(msg) => handler(msg),
                Err(e) => warn!(event = %name, error = %e, "dropping undecodable payload"),
            }
        })
    }

    /// Remove a handler. Returns false if the handle was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.shared.listeners.remove(handle)
    }

    /// Remove every handler. Returns how many were removed.
    pub fn unsubscribe_all(&self) -> usize {
        self.shared.listeners.clear()
    }

    /// Number of registered handlers.
    pub fn subscription_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Publish an event to the server.
    ///
    /// At-most-once: when not connected the event is dropped and false is
    /// returned. This is not an error.
    pub fn send(&self, event: &str, payload: Value) -> bool {
        if !self.is_connected() {
            debug!(event, "dropping outbound event: not connected");
            return false;
        }
        let outbound = self.shared.lock_outbound();
        match outbound.as_ref() {
            Some(tx) => tx.send(PushMessage::new(event, payload)).is_ok(),
            None => false,
        }
    }

    /// Send a heartbeat; the server answers with `pong`.
    pub fn ping(&self) -> bool {
        self.send(
            EVENT_PING,
            json!({ "timestamp": chrono::Utc::now().to_rfc3339() }),
        )
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<Driver>> {
        self.driver.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Transport + 'static> Drop for TransportChannel<T> {
    fn drop(&mut self) {
        let driver = self.driver.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(driver) = driver.take() {
            driver.cancel.cancel();
        }
    }
}

/// Why a live session ended.
enum SessionEnd {
    Cancelled,
    Dropped(String),
}

/// Background task: handshake, pump, reconnect.
async fn run_driver<T: Transport + 'static>(
    endpoint: String,
    config: ChannelConfig,
    factory: TransportFactory<T>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let mut failures = 0u32;

    loop {
        shared.set_state(ConnectionState::Connecting);

        // Create a new transport for each attempt
        let mut transport = factory();

        let handshake = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                shared.set_state(ConnectionState::Disconnected);
                return;
            }
            result = tokio::time::timeout(config.connect_timeout, transport.connect(&endpoint)) => {
                result.unwrap_or_else(|_| Err(TransportError::Timeout(config.connect_timeout.as_millis())))
            }
        };

        match handshake {
            Ok(()) => {
                failures = 0;
                let (tx, rx) = mpsc::unbounded_channel();
                shared.set_outbound(Some(tx));
                shared.set_state(ConnectionState::Connected);
                info!(%endpoint, "push channel connected");
                shared.listeners.emit(EVENT_CONNECT, &json!({ "endpoint": endpoint }));

                let end = pump(&mut transport, rx, &shared, &cancel).await;

                shared.set_outbound(None);
                if let Err(e) = transport.disconnect().await {
                    debug!(error = %e, "transport close failed");
                }
                shared.set_state(ConnectionState::Disconnected);

                match end {
                    SessionEnd::Cancelled => {
                        info!(%endpoint, "push channel disconnected");
                        shared
                            .listeners
                            .emit(EVENT_DISCONNECT, &json!({ "reason": "client disconnect" }));
                        return;
                    }
                    SessionEnd::Dropped(reason) => {
                        warn!(%endpoint, %reason, "push channel dropped, reconnecting");
                        shared
                            .listeners
                            .emit(EVENT_DISCONNECT, &json!({ "reason": reason }));
                    }
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                shared.set_state(ConnectionState::Disconnected);

                if failures >= config.max_retries {
                    warn!(%endpoint, attempts = failures, error = %e, "giving up on push channel");
                    shared.listeners.emit(
                        EVENT_CONNECTION_FAILED,
                        &json!({ "attempts": failures, "error": e.to_string() }),
                    );
                    return;
                }
                debug!(%endpoint, attempt = failures, error = %e, "handshake failed, will retry");
            }
        }

        // Fixed delay, checking for cancellation
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                shared.set_state(ConnectionState::Disconnected);
                return;
            }
            _ = tokio::time::sleep(config.retry_delay) => {}
        }
    }
}

/// Moves frames in both directions until the session ends.
async fn pump<T: Transport>(
    transport: &mut T,
    mut outbound: mpsc::UnboundedReceiver<PushMessage>,
    shared: &Shared,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            Some(msg) = outbound.recv() => {
                if let Err(e) = transport.send(msg).await {
                    return SessionEnd::Dropped(e.to_string());
                }
            }
            incoming = transport.recv() => match incoming {
                Ok(Some(msg)) => dispatch(shared, msg),
                Ok(None) => return SessionEnd::Dropped("closed by server".to_string()),
                Err(TransportError::SerializationError(e)) => {
                    warn!(error = %e, "skipping malformed frame");
                }
                Err(e) => return SessionEnd::Dropped(e.to_string()),
            },
        }
    }
}

fn dispatch(shared: &Shared, msg: PushMessage) {
    if is_reserved_event(&msg.event) {
        debug!(event = %msg.event, "ignoring reserved event name from server");
        return;
    }
    let delivered = shared.listeners.emit(&msg.event, &msg.data);
    trace!(event = %msg.event, delivered, "dispatched push event");
}

