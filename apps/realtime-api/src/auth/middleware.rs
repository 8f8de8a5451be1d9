//! Bearer JWT extraction for the admin HTTP routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::jwt::{self, AuthError, Role};
use crate::error::ApiError;
use crate::AppState;

/// Authenticated caller extracted from the `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = jwt::bearer_token(&parts.headers).ok_or(AuthError::Missing)?;
        let claims = jwt::verify_token(token, &state.config.jwt_secret)?;

        Ok(AuthUser {
            user_id: claims.id,
            username: claims.username,
            role: claims.role,
        })
    }
}

/// An [`AuthUser`] whose role is `admin`. Rejects everyone else with 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}
