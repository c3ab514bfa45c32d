use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    routing::{self, MethodRouter},
    Router,
};
use futures::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::RoleType;
use crate::error::ApiError;
use crate::middleware::{audit, auth::resolve_identity, roles::require_roles};
use crate::state::AppState;

pub const ADMIN: &[RoleType] = &[RoleType::Admin];
pub const ADMIN_OR_MANAGER: &[RoleType] = &[RoleType::Admin, RoleType::Manager];

/// Who may call an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Bearer token required; an empty slice admits any role.
    Roles(&'static [RoleType]),
}

impl Access {
    pub const AUTHENTICATED: Access = Access::Roles(&[]);
}

/// Loads the current JSON representation of one entity for the audit trail.
pub type SnapshotFn = fn(AppState, Uuid) -> BoxFuture<'static, Result<Option<Value>, ApiError>>;

/// What a resource group audits and how prior state is fetched
#[derive(Clone, Copy)]
pub struct AuditTarget {
    pub entity: &'static str,
    pub snapshot: Option<SnapshotFn>,
    /// Response keys replaced by `"[REDACTED]"` before the record is written.
    pub redact: &'static [&'static str],
}

impl AuditTarget {
    pub const fn new(entity: &'static str) -> Self {
        Self {
            entity,
            snapshot: None,
            redact: &[],
        }
    }

    pub fn with_snapshot(mut self, snapshot: SnapshotFn) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn redacting(mut self, keys: &'static [&'static str]) -> Self {
        self.redact = keys;
        self
    }
}

/// One route: method, path relative to its group, access rule and handler.
pub struct Endpoint {
    pub method: Method,
    pub path: &'static str,
    pub access: Access,
    pub handler: MethodRouter<AppState>,
    pub body_limit: Option<usize>,
}

macro_rules! endpoint_ctor {
    ($name:ident, $method:expr, $route:path) => {
        pub fn $name<H, T>(path: &'static str, access: Access, handler: H) -> Self
        where
            H: Handler<T, AppState>,
            T: 'static,
        {
            Self {
                method: $method,
                path,
                access,
                handler: $route(handler),
                body_limit: None,
            }
        }
    };
}

impl Endpoint {
    endpoint_ctor!(get, Method::GET, routing::get);
    endpoint_ctor!(post, Method::POST, routing::post);
    endpoint_ctor!(put, Method::PUT, routing::put);
    endpoint_ctor!(patch, Method::PATCH, routing::patch);
    endpoint_ctor!(delete, Method::DELETE, routing::delete);

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }
}

/// Endpoints sharing a path segment, e.g. everything under `/users`
pub struct ResourceGroup {
    pub name: &'static str,
    pub audit: Option<AuditTarget>,
    pub endpoints: Vec<Endpoint>,
}

impl ResourceGroup {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            audit: None,
            endpoints: Vec::new(),
        }
    }

    pub fn audited(mut self, target: AuditTarget) -> Self {
        self.audit = Some(target);
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Mounts every endpoint under `{prefix}/{name}`.
    ///
    /// Authenticated endpoints get, from outermost to innermost: identity
    /// resolution, the role check, then audit capture when the group declares
    /// a target.
    pub fn into_router(self, prefix: &str, state: &AppState) -> Router<AppState> {
        let mut router = Router::new();

        for endpoint in self.endpoints {
            let path = format!("{}/{}{}", prefix, self.name, endpoint.path);
            tracing::debug!("Route {} {} ({:?})", endpoint.method, path, endpoint.access);

            let mut handler = endpoint.handler;
            if let Some(limit) = endpoint.body_limit {
                handler = handler.layer(DefaultBodyLimit::max(limit));
            }

            if let Access::Roles(required) = endpoint.access {
                if let Some(target) = self.audit {
                    let ctx = audit::AuditContext {
                        state: state.clone(),
                        target,
                    };
                    handler = handler.route_layer(from_fn_with_state(ctx, audit::capture));
                }
                handler = handler
                    .route_layer(from_fn(require_roles(required)))
                    .route_layer(from_fn_with_state(state.clone(), resolve_identity));
            }

            router = router.route(&path, handler);
        }

        router
    }
}
