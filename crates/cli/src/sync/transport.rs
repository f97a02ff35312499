// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the push channel.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Scripted mock transports for unit testing

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use rollcall_core::PushMessage;

/// Error type for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Handshake did not finish in time.
    #[error("handshake timed out after {0} ms")]
    Timeout(u128),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// Transport trait for WebSocket-like communication.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send {
    /// Connect to a remote server.
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()>;

    /// Disconnect from the server.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Send a frame to the server.
    fn send(&mut self, msg: PushMessage) -> TransportFuture<'_, ()>;

    /// Receive a frame from the server.
    ///
    /// Returns `None` if the connection is closed. Must be cancel-safe: the
    /// channel drops this future whenever an outbound frame is ready.
    fn recv(&mut self) -> TransportFuture<'_, Option<PushMessage>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push transport over a WebSocket (`ws://` or `wss://`).
///
/// Each frame is one JSON text message. Control frames are handled by
/// tungstenite and binary frames are skipped.
#[derive(Default)]
pub struct WebSocketTransport {
    socket: Option<Halves>,
}

struct Halves {
    writer: SplitSink<Socket, Message>,
    reader: SplitStream<Socket>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What a single inbound message means for the caller.
enum Inbound {
    Frame(TransportResult<PushMessage>),
    Closed,
    Skip,
}

fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Frame(
            PushMessage::from_json(&text)
                .map_err(|e| TransportError::SerializationError(e.to_string())),
        ),
        Message::Close(_) => Inbound::Closed,
        _ => Inbound::Skip,
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let (writer, reader) = socket.split();
            self.socket = Some(Halves { writer, reader });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut halves) = self.socket.take() {
                // Best effort: the server may already have hung up.
                let _ = halves.writer.close().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: PushMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let text = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;
            let halves = self.socket.as_mut().ok_or(TransportError::ConnectionClosed)?;
            let sent = halves.writer.send(Message::Text(text.into())).await;
            sent.map_err(|e| {
                self.socket = None;
                TransportError::SendFailed(e.to_string())
            })
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<PushMessage>> {
        Box::pin(async move {
            let halves = self.socket.as_mut().ok_or(TransportError::ConnectionClosed)?;
            while let Some(next) = halves.reader.next().await {
                let message = match next {
                    Ok(message) => message,
                    Err(e) => {
                        self.socket = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                };
                match classify(message) {
                    Inbound::Frame(frame) => return frame.map(Some),
                    Inbound::Closed => break,
                    Inbound::Skip => continue,
                }
            }
            self.socket = None;
            Ok(None)
        })
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}
