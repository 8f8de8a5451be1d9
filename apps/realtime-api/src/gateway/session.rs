//! Per-connection state: identity, lifecycle, and the outbound queue.

use std::fmt;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::auth::jwt::Role;

use super::events::OutboundMessage;

/// Registry key. At most one live connection exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub user_id: i64,
    pub role: Role,
}

impl ConnectionKey {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.user_id, self.role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

/// A single authenticated socket session.
///
/// Writes go through an unbounded queue drained by the connection's writer
/// task, so every send is a non-blocking enqueue.
pub struct ConnectionHandle {
    /// Unique connection identifier (`conn_` prefixed ULID).
    pub id: String,
    pub user_id: i64,
    pub role: Role,
    pub username: String,
    state: Mutex<ConnectionState>,
    last_seen: Mutex<Instant>,
    tx: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    /// Create an open connection and the receiver its writer task drains.
    pub fn new(
        user_id: i64,
        role: Role,
        username: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: sekar_common::connection_id(),
            user_id,
            role,
            username: username.into(),
            state: Mutex::new(ConnectionState::Open),
            last_seen: Mutex::new(Instant::now()),
            tx,
        };
        (handle, rx)
    }

    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.user_id, self.role)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Open means not closing and the writer is still draining the queue.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open && !self.tx.is_closed()
    }

    /// Serialize and queue `message`. No-op unless the connection is open.
    pub fn send(&self, message: &OutboundMessage) -> bool {
        if !self.is_open() {
            return false;
        }
        match serde_json::to_string(message) {
            Ok(json) => self.send_text(Utf8Bytes::from(json)),
            Err(e) => {
                tracing::error!(?e, connection_id = %self.id, "failed to serialize outbound message");
                false
            }
        }
    }

    /// Queue an already-serialized frame. Used by fan-out to serialize once.
    pub fn send_text(&self, text: Utf8Bytes) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send(Message::Text(text)).is_ok()
    }

    /// Queue a protocol-level ping used for liveness probing.
    pub fn ping(&self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send(Message::Ping(Default::default())).is_ok()
    }

    /// Queue a close frame and stop accepting further sends.
    pub fn close(&self, code: u16, reason: &str) {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Open {
                return;
            }
            *state = ConnectionState::Closing;
        }
        let _ = self.tx.send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })));
    }

    pub fn mark_closed(&self) {
        *self.state.lock() = ConnectionState::Closed;
    }

    /// Record inbound activity from the client.
    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the connection was accepted, decoded from its id.
    pub fn connected_for(&self) -> Duration {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        sekar_common::id::connected_at_ms(&self.id)
            .map(|at| Duration::from_millis(now.saturating_sub(at)))
            .unwrap_or_default()
    }

    /// Time since the client was last heard from.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    #[cfg(test)]
    pub(crate) fn set_last_seen(&self, at: Instant) {
        *self.last_seen.lock() = at;
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("state", &self.state())
            .finish()
    }
}
