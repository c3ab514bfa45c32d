use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::handlers::{self, system};
use crate::middleware::capture_errors;
use crate::routing::ResourceGroup;
use crate::state::AppState;

/// Full application router.
///
/// Versioned groups and the fallback sit behind the error capture boundary.
/// `/` and `/health` answer on their own so a 503 health reply keeps its shape.
pub fn build_router(state: AppState) -> Router {
    build_router_with(state, Vec::new())
}

/// [`build_router`] plus `extra` groups mounted behind the same boundary.
pub fn build_router_with(state: AppState, extra: Vec<ResourceGroup>) -> Router {
    let prefix = state.config.server.api_prefix();

    let mut api = Router::new();
    let groups = handlers::resource_groups(state.config.storage.max_upload_bytes);
    for group in groups.into_iter().chain(extra) {
        api = api.merge(group.into_router(&prefix, &state));
    }
    let api = api
        .fallback(system::not_found)
        .layer(from_fn_with_state(state.clone(), capture_errors));

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}
