// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel to the attendance server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ TransportChannel │────►│  Transport  │────►│    Push     │
//! │  (driver task)   │◄────│   (trait)   │◄────│   Server    │
//! └──────────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌──────────────────┐
//! │    Listeners     │  (named-event subscriptions)
//! └──────────────────┘
//! ```
//!
//! # Features
//!
//! - WebSocket connection to the push server
//! - Bounded reconnect with a fixed delay
//! - Synthesized `connect`, `disconnect` and `connection-failed` events
//! - Injectable transport factory for testing

mod channel;
mod transport;

pub use channel::{ChannelConfig, ConnectionState, TransportChannel, TransportFactory};
pub use transport::{Transport, TransportError, TransportResult, WebSocketTransport};
