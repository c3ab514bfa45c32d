use axum::{extract::Request, middleware::Next, response::Response};
use futures::future::BoxFuture;

use super::auth::Identity;
use crate::database::models::RoleType;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("User role not found")]
    RoleNotFound,

    #[error("You do not have permission to access this resource")]
    InsufficientPrivilege,
}

/// An empty `required` set admits any authenticated identity.
pub fn check_access(required: &[RoleType], role: Option<RoleType>) -> Result<(), AccessDenied> {
    if required.is_empty() {
        return Ok(());
    }
    let role = role.ok_or(AccessDenied::RoleNotFound)?;
    if required.contains(&role) {
        Ok(())
    } else {
        Err(AccessDenied::InsufficientPrivilege)
    }
}

type AccessFuture = BoxFuture<'static, Result<Response, ApiError>>;

/// Layer function gating a route on the resolved identity's role.
/// Must run after `resolve_identity`.
pub fn require_roles(required: &'static [RoleType]) -> impl Fn(Request, Next) -> AccessFuture + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let identity = req
                .extensions()
                .get::<Identity>()
                .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

            if let Err(denied) = check_access(required, identity.role()) {
                tracing::warn!(
                    user = %identity.user.uuid,
                    role = ?identity.role(),
                    required = ?required,
                    "Access denied: {}",
                    denied
                );
                return Err(ApiError::forbidden(denied.to_string()));
            }

            Ok(next.run(req).await)
        })
    }
}
