use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::Claims;
use crate::database::models::{RoleType, User};
use crate::error::ApiError;
use crate::state::AppState;

/// Resolved identity: the user reloaded from storage after the token checked out.
/// Role decisions read `user.role`, never the token payload.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user: User,
    pub claims: Claims,
}

impl Identity {
    pub fn role(&self) -> Option<RoleType> {
        self.user.role
    }
}

/// Verifies the bearer token, reloads its subject and injects [`Identity`].
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers()).map_err(ApiError::unauthorized)?;

    let claims = state.tokens.verify(&token)?;

    let user = state
        .repos
        .users
        .find_by_uuid(claims.user_uuid)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token subject {} no longer exists", claims.user_uuid);
            ApiError::unauthorized("User not found! Use a valid token or login again.")
        })?;

    request.extensions_mut().insert(Identity { user, claims });
    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <jwt>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, &'static str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty JWT token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}
