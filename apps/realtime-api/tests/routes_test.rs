mod common;

use std::sync::Arc;

use axum::extract::ws::Message;
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;
use tokio::sync::mpsc::UnboundedReceiver;

use realtime_api::auth::jwt::Role;
use realtime_api::gateway::session::ConnectionHandle;
use realtime_api::AppState;

/// Register a socket-less connection and return the queue its writer would drain.
fn attach(state: &AppState, user_id: i64, role: Role) -> UnboundedReceiver<Message> {
    let (conn, rx) = ConnectionHandle::new(user_id, role, format!("user{user_id}"));
    state.connections.register(Arc::new(conn));
    rx
}

fn next_json(rx: &mut UnboundedReceiver<Message>) -> Option<serde_json::Value> {
    match rx.try_recv().ok()? {
        Message::Text(text) => Some(serde_json::from_str(text.as_str()).expect("parse")),
        other => panic!("expected text frame, got: {other:?}"),
    }
}

fn admin_bearer() -> String {
    format!("Bearer {}", common::mint_token(1, "admin", "root"))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let resp = server.get("/health").await;

    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
}

// ---------------------------------------------------------------------------
// GET /api/realtime/connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connection_stats_requires_auth() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let resp = server.get("/api/realtime/connections").await;

    resp.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "Authentication required");
}

#[tokio::test]
async fn connection_stats_rejects_invalid_token() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let resp = server
        .get("/api/realtime/connections")
        .add_header(AUTHORIZATION, format!("Bearer {}", common::mint_expired_token(1, "admin")))
        .await;

    resp.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["message"], "Invalid token");
}

#[tokio::test]
async fn connection_stats_forbidden_for_non_admin() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let token = common::mint_token(7, "customer", "budi");
    let resp = server
        .get("/api/realtime/connections")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;

    resp.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn connection_stats_counts_by_role() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let _a = attach(&state, 1, Role::Customer);
    let _b = attach(&state, 2, Role::Customer);
    let _c = attach(&state, 3, Role::Technician);

    let resp = server
        .get("/api/realtime/connections")
        .add_header(AUTHORIZATION, admin_bearer())
        .await;

    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["total"], 3);
    assert_eq!(body["customer"], 2);
    assert_eq!(body["technician"], 1);
    assert_eq!(body["admin"], 0);
}

// ---------------------------------------------------------------------------
// POST /api/realtime/broadcast
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_to_role_reaches_only_that_role() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let mut customer = attach(&state, 1, Role::Customer);
    let mut tech_a = attach(&state, 2, Role::Technician);
    let mut tech_b = attach(&state, 3, Role::Technician);

    let resp = server
        .post("/api/realtime/broadcast")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&serde_json::json!({
            "message": "New job assignments posted",
            "targetRole": "technician"
        }))
        .await;

    resp.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["delivered"], 2);

    for rx in [&mut tech_a, &mut tech_b] {
        let msg = next_json(rx).expect("technician should receive broadcast");
        assert_eq!(msg["type"], "broadcast");
        assert_eq!(msg["data"]["message"], "New job assignments posted");
        assert!(msg["data"]["timestamp"].is_string());
        assert_eq!(msg["targetRole"], "technician");
    }
    assert!(next_json(&mut customer).is_none());
}

#[tokio::test]
async fn broadcast_without_role_reaches_everyone() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let mut receivers = vec![
        attach(&state, 1, Role::Customer),
        attach(&state, 2, Role::Technician),
        attach(&state, 3, Role::Admin),
    ];

    let resp = server
        .post("/api/realtime/broadcast")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&serde_json::json!({ "message": "Scheduled maintenance tonight" }))
        .await;

    resp.assert_status(StatusCode::ACCEPTED);
    assert_eq!(resp.json::<serde_json::Value>()["delivered"], 3);

    for rx in receivers.iter_mut() {
        let msg = next_json(rx).expect("every connection should receive broadcast");
        assert_eq!(msg["type"], "broadcast");
        assert!(msg.get("targetRole").is_none());
    }
}

#[tokio::test]
async fn broadcast_rejects_blank_message() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let resp = server
        .post("/api/realtime/broadcast")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&serde_json::json!({ "message": "   " }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "message");
}

#[tokio::test]
async fn broadcast_forbidden_for_technician() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let token = common::mint_token(2, "technician", "agus");
    let resp = server
        .post("/api/realtime/broadcast")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .json(&serde_json::json!({ "message": "hi" }))
        .await;

    resp.assert_status(StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// POST /api/realtime/users/{user_id}/notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notify_user_forwards_payload_to_customer() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    let mut seven = attach(&state, 7, Role::Customer);
    let mut eight = attach(&state, 8, Role::Customer);

    let payload = serde_json::json!({ "title": "Bill due", "amount": 250000 });
    let resp = server
        .post("/api/realtime/users/7/notifications")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&payload)
        .await;

    resp.assert_status(StatusCode::ACCEPTED);
    assert_eq!(resp.json::<serde_json::Value>()["delivered"], 1);

    let msg = next_json(&mut seven).expect("customer 7 should be notified");
    assert_eq!(msg, serde_json::json!({ "type": "notification", "data": payload }));
    assert!(next_json(&mut eight).is_none());
}

#[tokio::test]
async fn notify_user_reports_zero_when_offline() {
    let state = common::test_state();
    let server = TestServer::new(common::test_app(&state)).unwrap();

    // A technician with the same id is not a customer connection.
    let mut tech = attach(&state, 7, Role::Technician);

    let resp = server
        .post("/api/realtime/users/7/notifications")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&serde_json::json!({ "title": "hello" }))
        .await;

    resp.assert_status(StatusCode::ACCEPTED);
    assert_eq!(resp.json::<serde_json::Value>()["delivered"], 0);
    assert!(next_json(&mut tech).is_none());
}
