use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use uuid::Uuid;

use super::auth::Identity;
use super::request_meta::RequestMeta;
use crate::database::models::NewAuditRecord;
use crate::error::ApiError;
use crate::routing::AuditTarget;
use crate::state::AppState;

/// Matches axum's default JSON body limit.
const MAX_BUFFERED_BODY: usize = 2 * 1024 * 1024;
const REDACTED: &str = "[REDACTED]";

#[derive(Clone)]
pub struct AuditContext {
    pub state: AppState,
    pub target: AuditTarget,
}

fn is_mutation(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

fn targets_existing(method: &Method) -> bool {
    matches!(*method, Method::PUT | Method::PATCH | Method::DELETE)
}

/// Records one audit entry per successful mutation. The old snapshot is taken
/// before the handler runs; the write happens after it and never alters the
/// response.
pub async fn capture(State(ctx): State<AuditContext>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    if !is_mutation(&method) {
        return next.run(req).await;
    }

    let meta = RequestMeta::from_request(&req);
    let user_uuid = req.extensions().get::<Identity>().map(|i| i.user.uuid);

    let (req, target_uuid) = if targets_existing(&method) {
        match locate_target(&meta, req).await {
            Ok(found) => found,
            Err(e) => return e.into_response(),
        }
    } else {
        (req, None)
    };

    let old_data = match (target_uuid, ctx.target.snapshot) {
        (Some(uuid), Some(load)) => match load(ctx.state.clone(), uuid).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Audit snapshot of {} {} failed: {}", ctx.target.entity, uuid, e);
                None
            }
        },
        _ => None,
    };

    let response = next.run(req).await;
    if !response.status().is_success() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer {} response for audit, record skipped: {}", ctx.target.entity, e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let new_data = serde_json::from_slice::<Value>(&bytes).ok().map(|mut value| {
        redact(&mut value, ctx.target.redact);
        value
    });

    ctx.state
        .audits
        .record(NewAuditRecord {
            entity: ctx.target.entity.to_string(),
            method: meta.method,
            user_uuid,
            old_data,
            new_data,
            url: meta.url,
            ip: meta.ip,
            user_agent: meta.user_agent,
        })
        .await;

    Response::from_parts(parts, Body::from(bytes))
}

/// Target uuid from the `uuid` query parameter, else from a JSON body's `uuid`.
async fn locate_target(meta: &RequestMeta, req: Request) -> Result<(Request, Option<Uuid>), ApiError> {
    if let Some(uuid) = meta.query.as_deref().and_then(uuid_from_query) {
        return Ok((req, Some(uuid)));
    }

    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        return Ok((req, None));
    }

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_BUFFERED_BODY)
        .await
        .map_err(|_| ApiError::payload_too_large("Request body is too large"))?;

    let uuid = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .as_ref()
        .and_then(|v| v.get("uuid"))
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok());

    Ok((Request::from_parts(parts, Body::from(bytes)), uuid))
}

fn uuid_from_query(query: &str) -> Option<Uuid> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "uuid")
        .and_then(|(_, value)| Uuid::parse_str(&value).ok())
}

/// Replaces every value stored under one of `keys`, at any depth.
pub fn redact(value: &mut Value, keys: &[&str]) {
    if keys.is_empty() {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if keys.contains(&key.as_str()) {
                    *inner = Value::String(REDACTED.to_string());
                } else {
                    redact(inner, keys);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| redact(item, keys)),
        _ => {}
    }
}
