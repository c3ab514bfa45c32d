use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use super::request_meta::RequestMeta;
use crate::database::models::NewErrorLog;
use crate::error::{ApiError, CapturedError, ErrorEnvelope, ErrorKind};
use crate::state::AppState;

/// Request bodies larger than this are not kept for diagnostics.
const MAX_DIAGNOSTIC_BODY: usize = 64 * 1024;

/// Global boundary: every failed response leaves through here as a
/// `{message, statusCode, error}` envelope, and each one is written to the
/// error log. Panics become unhandled 500s.
pub async fn capture_errors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let meta = RequestMeta::from_request(&req);
    let (req, diagnostic_body) = keep_json_body(req).await;

    let response = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => ApiError::unhandled(panic_message(panic.as_ref())).into_response(),
    };

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (response, captured) = normalize(response).await;
    let kind = captured.kind;

    if captured.detail.is_some() || kind == ErrorKind::InternalServerError {
        tracing::error!(
            method = %meta.method,
            url = %meta.url,
            query = meta.query.as_deref().unwrap_or(""),
            body = diagnostic_body.as_deref().unwrap_or(""),
            detail = captured.detail.as_deref().unwrap_or(""),
            "{} {}",
            kind.tag(),
            captured.message
        );
    } else {
        tracing::warn!(
            method = %meta.method,
            url = %meta.url,
            status = kind.status_code(),
            "{}",
            captured.message
        );
    }

    state
        .error_logs
        .record(NewErrorLog {
            error: captured.message,
            status_code: i32::from(kind.status_code()),
            status_text: kind.tag().to_string(),
            method: meta.method,
            path: meta.url,
            ip: meta.ip,
            user_agent: meta.user_agent,
        })
        .await;

    response
}

/// Responses built from `ApiError` pass through untouched. Anything else
/// (extractor rejections, 405s) is rewritten into the envelope.
async fn normalize(response: Response) -> (Response, CapturedError) {
    if let Some(captured) = response.extensions().get::<CapturedError>().cloned() {
        return (response, captured);
    }

    let kind = ErrorKind::from_status(response.status());
    let (parts, body) = response.into_parts();
    let text = to_bytes(body, MAX_DIAGNOSTIC_BODY)
        .await
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default();

    let message = if kind == ErrorKind::InternalServerError || text.is_empty() {
        kind.default_message().to_string()
    } else {
        text
    };

    let mut rebuilt = (kind.status(), Json(ErrorEnvelope::new(kind, message.clone()))).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rebuilt.headers_mut().append(name.clone(), value.clone());
        }
    }

    let captured = CapturedError {
        kind,
        message,
        detail: None,
    };
    rebuilt.extensions_mut().insert(captured.clone());
    (rebuilt, captured)
}

/// Buffers small JSON request bodies so unhandled failures can log them.
async fn keep_json_body(req: Request) -> (Request, Option<String>) {
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    let small = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len <= MAX_DIAGNOSTIC_BODY);

    if !(is_json && small) {
        return (req, None);
    }

    let (parts, body) = req.into_parts();
    match to_bytes(body, MAX_DIAGNOSTIC_BODY).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            (Request::from_parts(parts, Body::from(bytes)), Some(text))
        }
        Err(e) => {
            tracing::debug!("Request body unavailable for diagnostics: {}", e);
            (Request::from_parts(parts, Body::empty()), None)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    async fn envelope(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn api_errors_pass_through() {
        let (response, captured) = normalize(ApiError::conflict("dup").into_response()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(captured.kind, ErrorKind::Conflict);
        assert_eq!(captured.message, "dup");
    }

    #[tokio::test]
    async fn foreign_client_errors_fold_into_bad_request() {
        let raw = (StatusCode::UNPROCESSABLE_ENTITY, "missing field `email`").into_response();
        let (response, captured) = normalize(raw).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(captured.kind, ErrorKind::BadRequest);
        assert_eq!(
            envelope(response).await,
            serde_json::json!({
                "message": "missing field `email`",
                "statusCode": 400,
                "error": "BAD_REQUEST"
            })
        );
    }

    #[tokio::test]
    async fn server_error_text_is_not_echoed() {
        let raw = (StatusCode::BAD_GATEWAY, "upstream said: password=hunter2").into_response();
        let (response, captured) = normalize(raw).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!captured.message.contains("hunter2"));
        let body = envelope(response).await;
        assert_eq!(body["error"], "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn panic_payloads_are_described() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "panic: boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "panic: bang");
    }
}
