//! Wire-format messages exchanged over the realtime socket.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::jwt::{Claims, Role};

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// The fixed set of event kinds the server pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    ConnectionEstablished,
    Notification,
    InstallationUpdate,
    PaymentUpdate,
    SupportUpdate,
    Broadcast,
    Pong,
}

/// A message sent from the server to the client over WebSocket.
///
/// `data` is opaque: domain payloads from the REST layer are forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<Role>,
}

impl OutboundMessage {
    pub fn new(kind: MessageKind, data: Value) -> Self {
        Self {
            kind,
            data,
            target_user_id: None,
            target_role: None,
        }
    }

    /// First message on every accepted connection.
    pub fn connection_established(claims: &Claims) -> Self {
        Self::new(
            MessageKind::ConnectionEstablished,
            serde_json::json!({
                "userId": claims.id,
                "role": claims.role,
                "message": "Connected to SEKAR NET real-time updates",
            }),
        )
    }

    /// Reply to a client `ping`; `timestamp` is unix time in milliseconds.
    pub fn pong() -> Self {
        Self::new(
            MessageKind::Pong,
            serde_json::json!({ "timestamp": Utc::now().timestamp_millis() }),
        )
    }

    /// Operator announcement, optionally scoped to one role.
    pub fn broadcast(message: &str, target_role: Option<Role>) -> Self {
        Self {
            target_role,
            ..Self::new(
                MessageKind::Broadcast,
                serde_json::json!({
                    "message": message,
                    "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                }),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A control message received from the client.
///
/// Anything with an unrecognised `type` decodes as [`ClientMessage::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    JoinRoom {
        #[serde(default)]
        room: Option<String>,
    },
    #[serde(other)]
    Unknown,
}
