//! Inbound control message dispatch: `ping`, `join_room`, and everything else.

use super::events::{ClientMessage, OutboundMessage};
use super::session::ConnectionHandle;

/// Handle one text frame from a registered connection.
///
/// Never fails: malformed or unrecognised input is logged and dropped, and the
/// connection stays open.
pub fn handle_client_message(conn: &ConnectionHandle, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(?e, connection_id = %conn.id, "ignoring malformed client message");
            return;
        }
    };

    match message {
        ClientMessage::Ping => {
            conn.send(&OutboundMessage::pong());
        }
        ClientMessage::JoinRoom { room } => {
            // Rooms are not scoped yet; acknowledge by logging only.
            tracing::info!(
                user_id = conn.user_id,
                role = %conn.role,
                room = room.as_deref().unwrap_or(""),
                "client joined room"
            );
        }
        ClientMessage::Unknown => {
            tracing::debug!(connection_id = %conn.id, "ignoring unknown client message type");
        }
    }
}
