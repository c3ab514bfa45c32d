pub mod audit;
pub mod auth;
pub mod error_capture;
pub mod request_meta;
pub mod response;
pub mod roles;

pub use audit::AuditContext;
pub use auth::{resolve_identity, Identity};
pub use error_capture::capture_errors;
pub use request_meta::RequestMeta;
pub use response::{ApiResponse, ApiResult};
pub use roles::{check_access, require_roles, AccessDenied};
