pub mod audit_service;
pub mod auth_service;
pub mod email_service;
pub mod error_log_service;
pub mod file_service;
pub mod role_service;
pub mod seed_service;
pub mod user_service;

pub use audit_service::AuditService;
pub use auth_service::{AuthService, LoginResponse};
pub use email_service::{EmailService, EmailTemplateService, LogTransport, MailTransport, RenderedEmail};
pub use error_log_service::ErrorLogService;
pub use file_service::{FileService, FileStorage, LocalStorage, UploadKind, UploadedFile};
pub use role_service::RoleService;
pub use user_service::UserService;

use validator::Validate;

use crate::error::ApiError;

/// Runs derive-based validation and folds the failures into one 400 message.
pub fn validate_dto<T: Validate>(dto: &T) -> Result<(), ApiError> {
    dto.validate().map_err(|errors| {
        let message = errors
            .to_string()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::bad_request(format!("Validation failed: {}", message))
    })
}
