use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::errors::RepositoryError;
use crate::database::models::{
    AuditRecord, EmailTemplate, ErrorLogRecord, FileRecord, NewAuditRecord, NewEmailTemplate,
    NewErrorLog, NewFile, NewPasswordReset, NewRole, NewUser, PasswordResetRequest, Role,
    RoleType, User, UserChanges,
};
use crate::pagination::PageRequest;

pub type RepoResult<T> = Result<T, RepositoryError>;

/// One page of rows plus the total row count matching the same filter
pub type PageSlice<T> = (Vec<T>, i64);

/// Users. Lookups and lists skip soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> RepoResult<User>;
    async fn find_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Fails with `NotFound` when the user is missing or soft-deleted.
    async fn update(&self, uuid: Uuid, changes: UserChanges) -> RepoResult<User>;
    async fn soft_delete(&self, uuid: Uuid) -> RepoResult<User>;
    async fn hard_delete(&self, uuid: Uuid) -> RepoResult<()>;
    /// Search matches `name` case-insensitively.
    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<User>>;
    async fn exists_with_role(&self, role: RoleType) -> RepoResult<bool>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, role: NewRole) -> RepoResult<Role>;
    async fn find_by_type(&self, role_type: RoleType) -> RepoResult<Option<Role>>;
}

/// Append-only audit trail
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn create(&self, record: NewAuditRecord) -> RepoResult<AuditRecord>;
    /// Newest first; search matches `entity` or `method`.
    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<AuditRecord>>;
}

/// Append-only error log
#[async_trait]
pub trait ErrorLogRepository: Send + Sync {
    async fn create(&self, record: NewErrorLog) -> RepoResult<ErrorLogRecord>;
    /// Newest first; search matches `error`.
    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<ErrorLogRecord>>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, file: NewFile) -> RepoResult<FileRecord>;
    async fn find_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<FileRecord>>;
    /// Returns the removed row, `NotFound` when absent.
    async fn delete(&self, uuid: Uuid) -> RepoResult<FileRecord>;
}

#[async_trait]
pub trait EmailTemplateRepository: Send + Sync {
    async fn create(&self, template: NewEmailTemplate) -> RepoResult<EmailTemplate>;
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<EmailTemplate>>;
    /// Ordered by name; search matches `name`.
    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<EmailTemplate>>;
}

#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Stores a new request after marking older unused ones for the user as used.
    async fn create(&self, request: NewPasswordReset) -> RepoResult<PasswordResetRequest>;
    /// Latest unused, unexpired request for the user.
    async fn find_active(&self, user_uuid: Uuid, now: DateTime<Utc>) -> RepoResult<Option<PasswordResetRequest>>;
    /// Increments the attempt counter and marks the request used once it reaches `max_attempts`.
    async fn record_failed_attempt(&self, uuid: Uuid, max_attempts: i32) -> RepoResult<PasswordResetRequest>;
    async fn mark_used(&self, uuid: Uuid) -> RepoResult<()>;
}

/// Every repository the application consumes, behind trait objects so the
/// PostgreSQL and in-memory backends are interchangeable.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub audits: Arc<dyn AuditRepository>,
    pub error_logs: Arc<dyn ErrorLogRepository>,
    pub files: Arc<dyn FileRepository>,
    pub email_templates: Arc<dyn EmailTemplateRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
}

/// Escapes LIKE metacharacters and wraps the term for a contains-match.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
