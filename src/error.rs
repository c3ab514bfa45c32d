// HTTP API Error Types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::errors::RepositoryError;

/// Fixed error taxonomy shared by the wire envelope and the error log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    PayloadTooLarge,
    UnsupportedMediaType,
    InternalServerError,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::UnsupportedMediaType => 415,
            ErrorKind::InternalServerError => 500,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorKind::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Classify an arbitrary HTTP status. Client errors outside the taxonomy
    /// (405, 422, ...) fold into BAD_REQUEST, server errors into INTERNAL_SERVER_ERROR.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            413 => ErrorKind::PayloadTooLarge,
            415 => ErrorKind::UnsupportedMediaType,
            400..=499 => ErrorKind::BadRequest,
            _ => ErrorKind::InternalServerError,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::PayloadTooLarge => "Payload too large",
            ErrorKind::UnsupportedMediaType => "Unsupported media type",
            ErrorKind::InternalServerError => "Internal server error",
        }
    }
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 415 Unsupported Media Type
    UnsupportedMediaType(String),

    // 500 Internal Server Error
    InternalServerError(String),

    /// Raw failure nobody classified. The detail stays server-side.
    Unhandled(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest(_) => ErrorKind::BadRequest,
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::PayloadTooLarge(_) => ErrorKind::PayloadTooLarge,
            ApiError::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            ApiError::InternalServerError(_) | ApiError::Unhandled(_) => ErrorKind::InternalServerError,
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::InternalServerError(msg) => msg,
            ApiError::Unhandled(_) => ErrorKind::InternalServerError.default_message(),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        self.kind().tag()
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(self, ApiError::Unhandled(_))
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!(ErrorEnvelope::new(self.kind(), self.message()))
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        ApiError::UnsupportedMediaType(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn unhandled(detail: impl Into<String>) -> Self {
        ApiError::Unhandled(detail.into())
    }
}

/// Wire-format error body. Exactly three keys on every failure path.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub message: String,
    pub status_code: u16,
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: kind.status_code(),
            error: kind.tag().to_string(),
        }
    }
}

/// Attached to error responses so the capture boundary can log the classified
/// failure without re-parsing the body.
#[derive(Debug, Clone)]
pub struct CapturedError {
    pub kind: ErrorKind,
    pub message: String,
    /// Present only for unhandled failures.
    pub detail: Option<String>,
}

// Data-layer codes mapped onto the taxonomy with sanitized messages
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ValueTooLong { column } => ApiError::bad_request(format!(
                "The value provided for the field \"{}\" is too long.",
                column
            )),
            RepositoryError::NotFound => {
                ApiError::not_found("The requested record could not be found.")
            }
            RepositoryError::UniqueViolation { field } => {
                ApiError::conflict(format!("A record with the same {} already exists.", field))
            }
            RepositoryError::ForeignKeyViolation { field } => {
                ApiError::bad_request(format!("Invalid reference for field \"{}\".", field))
            }
            RepositoryError::NotNullViolation { column } => {
                ApiError::bad_request(format!("A required field is missing: {}.", column))
            }
            RepositoryError::OutOfRange => {
                ApiError::bad_request("The provided value is out of range.")
            }
            RepositoryError::Unavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                ApiError::internal_server_error("A database error occurred. Please try again later.")
            }
            RepositoryError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("Unclassified database error: {}", sqlx_err);
                ApiError::internal_server_error("A database error occurred. Please try again later.")
            }
        }
    }
}

impl From<crate::auth::TokenError> for ApiError {
    fn from(err: crate::auth::TokenError) -> Self {
        match err {
            crate::auth::TokenError::Invalid(reason) => {
                tracing::debug!("Rejected token: {}", reason);
                ApiError::unauthorized("Invalid or expired token.")
            }
            crate::auth::TokenError::Generation(msg) => {
                tracing::error!("Token generation failed: {}", msg);
                ApiError::internal_server_error("Failed to issue access token")
            }
        }
    }
}

impl From<crate::security::SecurityError> for ApiError {
    fn from(err: crate::security::SecurityError) -> Self {
        tracing::error!("Credential primitive failed: {}", err);
        ApiError::internal_server_error("Failed to process credentials")
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unhandled(detail) => write!(f, "unhandled: {}", detail),
            _ => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let captured = CapturedError {
            kind,
            message: self.message().to_string(),
            detail: match &self {
                ApiError::Unhandled(detail) => Some(detail.clone()),
                _ => None,
            },
        };

        let mut response = (kind.status(), Json(self.to_json())).into_response();
        response.extensions_mut().insert(captured);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [ErrorKind; 8] = [
        ErrorKind::BadRequest,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::PayloadTooLarge,
        ErrorKind::UnsupportedMediaType,
        ErrorKind::InternalServerError,
    ];

    #[test]
    fn test_taxonomy_table() {
        let expected = [
            (400, "BAD_REQUEST"),
            (401, "UNAUTHORIZED"),
            (403, "FORBIDDEN"),
            (404, "NOT_FOUND"),
            (409, "CONFLICT"),
            (413, "PAYLOAD_TOO_LARGE"),
            (415, "UNSUPPORTED_MEDIA_TYPE"),
            (500, "INTERNAL_SERVER_ERROR"),
        ];
        for (kind, (code, tag)) in ALL_KINDS.iter().zip(expected) {
            assert_eq!(kind.status_code(), code);
            assert_eq!(kind.tag(), tag);
            assert_eq!(ErrorKind::from_status(kind.status()), *kind);
        }
    }

    #[test]
    fn test_envelope_has_exactly_three_keys() {
        let errors = vec![
            ApiError::bad_request("bad"),
            ApiError::unauthorized("who"),
            ApiError::forbidden("no"),
            ApiError::not_found("gone"),
            ApiError::conflict("dup"),
            ApiError::payload_too_large("big"),
            ApiError::unsupported_media_type("type"),
            ApiError::internal_server_error("boom"),
            ApiError::unhandled("panic at the disco"),
        ];

        for err in errors {
            let body = err.to_json();
            let obj = body.as_object().unwrap();
            assert_eq!(obj.len(), 3, "unexpected keys in {}", body);
            assert_eq!(obj["statusCode"], err.status_code());
            assert_eq!(obj["error"], err.error_code());
            assert!(obj["message"].is_string());
        }
    }

    #[test]
    fn test_unhandled_detail_never_reaches_client() {
        let err = ApiError::unhandled("connection reset by peer at 10.0.0.7");
        assert_eq!(err.message(), "Internal server error");
        assert!(!err.to_json().to_string().contains("10.0.0.7"));

        let response = err.into_response();
        let captured = response.extensions().get::<CapturedError>().unwrap();
        assert_eq!(captured.detail.as_deref(), Some("connection reset by peer at 10.0.0.7"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_out_of_taxonomy_statuses_fold() {
        assert_eq!(ErrorKind::from_status(StatusCode::METHOD_NOT_ALLOWED), ErrorKind::BadRequest);
        assert_eq!(ErrorKind::from_status(StatusCode::UNPROCESSABLE_ENTITY), ErrorKind::BadRequest);
        assert_eq!(ErrorKind::from_status(StatusCode::BAD_GATEWAY), ErrorKind::InternalServerError);
    }

    #[test]
    fn test_repository_error_mapping() {
        let cases = vec![
            (RepositoryError::ValueTooLong { column: "name".into() }, 400, "The value provided for the field \"name\" is too long."),
            (RepositoryError::NotFound, 404, "The requested record could not be found."),
            (RepositoryError::UniqueViolation { field: "email".into() }, 409, "A record with the same email already exists."),
            (RepositoryError::ForeignKeyViolation { field: "role_uuid".into() }, 400, "Invalid reference for field \"role_uuid\"."),
            (RepositoryError::NotNullViolation { column: "email".into() }, 400, "A required field is missing: email."),
            (RepositoryError::OutOfRange, 400, "The provided value is out of range."),
            (RepositoryError::Unavailable("pool closed".into()), 500, "A database error occurred. Please try again later."),
        ];

        for (err, status, message) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.message(), message);
        }
    }
}
