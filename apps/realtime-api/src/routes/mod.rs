pub mod health;
pub mod realtime;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::config::Config;
use crate::AppState;

pub fn router(config: &Config) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router(&config.ws_path))
        .nest("/api/realtime", realtime::router())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        realtime::connection_stats,
        realtime::broadcast,
        realtime::notify_user,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            crate::auth::jwt::Role,
            health::HealthResponse,
            realtime::ConnectionStatsResponse,
            realtime::BroadcastRequest,
            realtime::DeliveryResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Realtime", description = "Live connection diagnostics and admin pushes"),
    )
)]
pub struct ApiDoc;
