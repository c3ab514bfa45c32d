// handlers/system.rs - unversioned `/` and `/health`

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// GET / - service banner
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let prefix = state.config.server.api_prefix();

    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "environment": state.config.environment,
        "endpoints": {
            "health": "/health (public)",
            "auth": format!("{}/auth/* (login, forgot/reset password public)", prefix),
            "users": format!("{}/users/* (protected)", prefix),
            "audits": format!("{}/audits/list (ADMIN)", prefix),
            "logs": format!("{}/logs/list (ADMIN)", prefix),
            "files": format!("{}/files/* (protected)", prefix),
            "email_templates": format!("{}/email-templates/* (ADMIN)", prefix),
        }
    }))
}

/// GET /health - 503 when the database does not answer
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    if state.database_healthy().await {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database": "unavailable"
            })),
        )
    }
}

/// Fallback for unknown routes
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(format!("Cannot {} {}", method, uri.path()))
}
