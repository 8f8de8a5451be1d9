//! Typed pushes the REST layer calls after it mutates domain state.
//!
//! Each wrapper targets a single customer connection with a fixed event kind.
//! Payloads (bills, installation requests, tickets) are forwarded untouched.

use serde_json::Value;

use crate::auth::jwt::Role;

use super::events::{MessageKind, OutboundMessage};
use super::registry::ConnectionRegistry;

impl ConnectionRegistry {
    /// An installation request changed status (scheduled, assigned, completed).
    pub fn send_installation_update(&self, user_id: i64, installation: Value) -> bool {
        self.push_to_customer(user_id, MessageKind::InstallationUpdate, installation)
    }

    /// A bill was paid, approved, or rejected.
    pub fn send_payment_update(&self, user_id: i64, payment: Value) -> bool {
        self.push_to_customer(user_id, MessageKind::PaymentUpdate, payment)
    }

    /// A support ticket got a reply or changed status.
    pub fn send_support_update(&self, user_id: i64, ticket: Value) -> bool {
        self.push_to_customer(user_id, MessageKind::SupportUpdate, ticket)
    }

    pub fn send_notification(&self, user_id: i64, notification: Value) -> bool {
        self.push_to_customer(user_id, MessageKind::Notification, notification)
    }

    /// Announce `message` to everyone, or only to `target_role` when given.
    pub fn send_broadcast(&self, message: &str, target_role: Option<Role>) -> usize {
        let msg = OutboundMessage::broadcast(message, target_role);
        let delivered = match target_role {
            Some(role) => self.send_to_role(role, &msg),
            None => self.broadcast(&msg),
        };
        tracing::info!(
            target_role = target_role.map(|r| r.as_str()).unwrap_or("all"),
            delivered,
            "broadcast sent"
        );
        delivered
    }

    fn push_to_customer(&self, user_id: i64, kind: MessageKind, data: Value) -> bool {
        let delivered = self.send_to_user(user_id, Role::Customer, &OutboundMessage::new(kind, data));
        tracing::debug!(user_id, ?kind, delivered, "customer push");
        delivered
    }
}
