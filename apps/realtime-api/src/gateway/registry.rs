//! Registry of live socket connections keyed by `(user_id, role)`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;

use crate::auth::jwt::Role;

use super::events::OutboundMessage;
use super::session::{ConnectionHandle, ConnectionKey};

/// Close code sent to connections evicted for inactivity ("going away").
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Shared registry of all authenticated connections.
///
/// Every operation is synchronous and runs to completion under `DashMap`'s
/// shard locks. Delivery is best-effort: a missing or closed target is a
/// silent no-op, never an error.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionKey, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection under its `(user_id, role)` key.
    ///
    /// A previous connection for the same key is replaced and returned. It is
    /// not closed here; it simply stops receiving pushes.
    pub fn register(&self, conn: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let key = conn.key();
        let replaced = self.connections.insert(key, conn);
        if let Some(prev) = &replaced {
            tracing::info!(
                %key,
                replaced_connection_id = %prev.id,
                "connection replaced by newer session"
            );
        }
        replaced
    }

    /// Remove `key` if it is still held by `connection_id`.
    ///
    /// Returns `false` when the entry is already gone or belongs to a newer
    /// connection.
    pub fn unregister(&self, key: &ConnectionKey, connection_id: &str) -> bool {
        self.connections
            .remove_if(key, |_, conn| conn.id == connection_id)
            .is_some()
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(key).map(|entry| entry.value().clone())
    }

    /// Deliver to the exact `(user_id, role)` connection if it is open.
    pub fn send_to_user(&self, user_id: i64, role: Role, message: &OutboundMessage) -> bool {
        match self.connections.get(&ConnectionKey::new(user_id, role)) {
            Some(conn) => conn.send(message),
            None => {
                tracing::trace!(user_id, %role, kind = ?message.kind, "no live connection for push");
                false
            }
        }
    }

    /// Deliver to every open connection with `role`. Returns the number reached.
    pub fn send_to_role(&self, role: Role, message: &OutboundMessage) -> usize {
        self.fan_out(message, |conn| conn.role == role)
    }

    /// Deliver to every open connection. Returns the number reached.
    pub fn broadcast(&self, message: &OutboundMessage) -> usize {
        self.fan_out(message, |_| true)
    }

    fn fan_out(&self, message: &OutboundMessage, filter: impl Fn(&ConnectionHandle) -> bool) -> usize {
        let text = match serde_json::to_string(message) {
            Ok(json) => Utf8Bytes::from(json),
            Err(e) => {
                tracing::error!(?e, kind = ?message.kind, "failed to serialize outbound message");
                return 0;
            }
        };

        let mut delivered = 0;
        for entry in self.connections.iter() {
            let conn = entry.value();
            if filter(conn) && conn.send_text(text.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Total registered connections.
    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }

    /// Registered connections with `role`, counted by scanning.
    pub fn connected_count_by_role(&self, role: Role) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.key().role == role)
            .count()
    }

    /// Close and remove connections idle for longer than `max_idle`, along
    /// with any whose writer has already gone away. Returns the number removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.connections.len();
        self.connections.retain(|key, conn| {
            if conn.is_open() && conn.idle_for() <= max_idle {
                return true;
            }
            tracing::warn!(
                %key,
                connection_id = %conn.id,
                idle_secs = conn.idle_for().as_secs(),
                "evicting stale connection"
            );
            conn.close(CLOSE_GOING_AWAY, "Idle timeout");
            false
        });
        before.saturating_sub(self.connections.len())
    }
}
