pub mod audit;
pub mod email_template;
pub mod error_log;
pub mod file;
pub mod password_reset;
pub mod role;
pub mod user;

pub use audit::{AuditRecord, NewAuditRecord};
pub use email_template::{EmailTemplate, NewEmailTemplate};
pub use error_log::{ErrorLogRecord, NewErrorLog};
pub use file::{FileRecord, NewFile};
pub use password_reset::{NewPasswordReset, PasswordResetRequest};
pub use role::{NewRole, Role, RoleType, UnknownRoleType};
pub use user::{CreateUserDto, NewUser, UpdateUserDto, User, UserChanges};
