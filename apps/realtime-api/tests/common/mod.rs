#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use realtime_api::config::Config;
use realtime_api::AppState;

pub const TEST_SECRET: &str = "sekar-net-test-secret";

/// Claims for minting test tokens (mirrors what the REST login flow signs).
#[derive(Debug, Serialize)]
pub struct TestClaims {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mint a valid HS256 token for `role`.
pub fn mint_token(user_id: i64, role: &str, username: &str) -> String {
    mint_with(TEST_SECRET, user_id, role, username, 3600)
}

/// Mint a token that expired five minutes ago.
pub fn mint_expired_token(user_id: i64, role: &str) -> String {
    mint_with(TEST_SECRET, user_id, role, "expired_user", -300)
}

pub fn mint_with(secret: &str, user_id: i64, role: &str, username: &str, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = TestClaims {
        id: user_id,
        username: username.to_string(),
        role: role.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("mint test token")
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: TEST_SECRET.to_string(),
        port: 0,
        ws_path: "/ws".to_string(),
        heartbeat_interval: Duration::from_secs(30),
        idle_timeout: Duration::from_secs(90),
    }
}

/// Build a test AppState with a fresh registry.
pub fn test_state() -> AppState {
    AppState::new(test_config())
}

/// Build the full application router wired to `state`.
pub fn test_app(state: &AppState) -> Router {
    realtime_api::routes::router(&state.config).with_state(state.clone())
}
