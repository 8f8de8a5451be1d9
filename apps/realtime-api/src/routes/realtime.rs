//! Admin endpoints over the connection registry: diagnostics and pushes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::jwt::Role;
use crate::auth::middleware::AdminUser;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connections", get(connection_stats))
        .route("/broadcast", post(broadcast))
        .route("/users/{user_id}/notifications", post(notify_user))
}

/// Number of connections that received a push.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub delivered: usize,
}

// ---------------------------------------------------------------------------
// GET /api/realtime/connections
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionStatsResponse {
    pub total: usize,
    pub customer: usize,
    pub technician: usize,
    pub admin: usize,
}

#[utoipa::path(
    get,
    path = "/api/realtime/connections",
    tag = "Realtime",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Live connection counts", body = ConnectionStatsResponse),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody),
        (status = 403, description = "Caller is not an admin", body = ApiErrorBody),
    ),
)]
pub async fn connection_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<ConnectionStatsResponse> {
    let registry = &state.connections;
    Json(ConnectionStatsResponse {
        total: registry.connected_count(),
        customer: registry.connected_count_by_role(Role::Customer),
        technician: registry.connected_count_by_role(Role::Technician),
        admin: registry.connected_count_by_role(Role::Admin),
    })
}

// ---------------------------------------------------------------------------
// POST /api/realtime/broadcast
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub message: String,
    /// Limit delivery to one role. Omit to reach everyone.
    #[serde(default)]
    pub target_role: Option<Role>,
}

#[utoipa::path(
    post,
    path = "/api/realtime/broadcast",
    tag = "Realtime",
    security(("bearer" = [])),
    request_body = BroadcastRequest,
    responses(
        (status = 202, description = "Broadcast queued", body = DeliveryResponse),
        (status = 400, description = "Empty message", body = ApiErrorBody),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody),
        (status = 403, description = "Caller is not an admin", body = ApiErrorBody),
    ),
)]
pub async fn broadcast(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(body): Json<BroadcastRequest>,
) -> Result<(StatusCode, Json<DeliveryResponse>), ApiError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "message".to_string(),
            message: "must not be empty".to_string(),
        }]));
    }

    tracing::info!(admin_id = admin.user_id, target_role = ?body.target_role, "admin broadcast");
    let delivered = state.connections.send_broadcast(message, body.target_role);

    Ok((StatusCode::ACCEPTED, Json(DeliveryResponse { delivered })))
}

// ---------------------------------------------------------------------------
// POST /api/realtime/users/{user_id}/notifications
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/realtime/users/{user_id}/notifications",
    tag = "Realtime",
    security(("bearer" = [])),
    params(("user_id" = i64, Path, description = "Customer to notify")),
    responses(
        (status = 202, description = "Opaque JSON body forwarded as a notification; delivered is 0 when the customer is offline", body = DeliveryResponse),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody),
        (status = 403, description = "Caller is not an admin", body = ApiErrorBody),
    ),
)]
pub async fn notify_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<DeliveryResponse>) {
    let delivered = usize::from(state.connections.send_notification(user_id, payload));
    (StatusCode::ACCEPTED, Json(DeliveryResponse { delivered }))
}
