//! In-memory repositories mirroring the PostgreSQL behaviour the services
//! rely on: the case-insensitive unique email index, soft-delete filtering,
//! newest-first ordering and case-insensitive search.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::database::models::{
    AuditRecord, EmailTemplate, ErrorLogRecord, FileRecord, NewAuditRecord, NewEmailTemplate,
    NewErrorLog, NewFile, NewPasswordReset, NewRole, NewUser, PasswordResetRequest, Role,
    RoleType, User, UserChanges,
};
use crate::database::repository::{
    AuditRepository, EmailTemplateRepository, ErrorLogRepository, FileRepository,
    PageSlice, PasswordResetRepository, RepoResult, Repositories, RoleRepository, UserRepository,
};
use crate::database::RepositoryError;
use crate::pagination::PageRequest;

#[derive(Default)]
struct Store {
    users: Vec<User>,
    roles: Vec<Role>,
    audits: Vec<AuditRecord>,
    error_logs: Vec<ErrorLogRecord>,
    files: Vec<FileRecord>,
    templates: Vec<EmailTemplate>,
    resets: Vec<PasswordResetRequest>,
}

/// Shared store behind every in-memory repository, plus fault switches.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
    audits_failing: Arc<AtomicBool>,
    error_logs_failing: Arc<AtomicBool>,
    file_reads_failing: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(MemoryUsers(self.clone())),
            roles: Arc::new(MemoryRoles(self.clone())),
            audits: Arc::new(MemoryAudits(self.clone())),
            error_logs: Arc::new(MemoryErrorLogs(self.clone())),
            files: Arc::new(MemoryFiles(self.clone())),
            email_templates: Arc::new(MemoryTemplates(self.clone())),
            password_resets: Arc::new(MemoryResets(self.clone())),
        }
    }

    /// Makes every audit insert fail as if the table were unavailable.
    pub fn set_audits_failing(&self, failing: bool) {
        self.audits_failing.store(failing, Ordering::SeqCst);
    }

    /// Same for error log inserts.
    pub fn set_error_logs_failing(&self, failing: bool) {
        self.error_logs_failing.store(failing, Ordering::SeqCst);
    }

    /// Makes file lookups by uuid fail; inserts and deletes still work.
    pub fn set_file_reads_failing(&self, failing: bool) {
        self.file_reads_failing.store(failing, Ordering::SeqCst);
    }

    pub fn audits(&self) -> Vec<AuditRecord> {
        self.lock().map(|s| s.audits.clone()).unwrap_or_default()
    }

    pub fn error_logs(&self) -> Vec<ErrorLogRecord> {
        self.lock().map(|s| s.error_logs.clone()).unwrap_or_default()
    }

    /// Includes soft-deleted rows.
    pub fn all_users(&self) -> Vec<User> {
        self.lock().map(|s| s.users.clone()).unwrap_or_default()
    }

    pub fn reset_requests(&self) -> Vec<PasswordResetRequest> {
        self.lock().map(|s| s.resets.clone()).unwrap_or_default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store poisoned".to_string()))
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T: Clone>(rows: Vec<T>, page: &PageRequest) -> PageSlice<T> {
    let total = rows.len() as i64;
    let data = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (data, total)
}

fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
}

fn role_type_of(store: &Store, role_uuid: Option<Uuid>) -> Option<RoleType> {
    role_uuid.and_then(|id| store.roles.iter().find(|r| r.uuid == id).map(|r| r.role_type))
}

fn email_taken(store: &Store, email: &str, except: Option<Uuid>) -> bool {
    store
        .users
        .iter()
        .any(|u| Some(u.uuid) != except && u.email.eq_ignore_ascii_case(email))
}

struct MemoryUsers(MemoryBackend);

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.0.lock()?;
        if email_taken(&store, &user.email, None) {
            return Err(RepositoryError::UniqueViolation { field: "email".to_string() });
        }
        let role = role_type_of(&store, Some(user.role_uuid)).ok_or_else(|| {
            RepositoryError::ForeignKeyViolation { field: "role_uuid".to_string() }
        })?;

        let now = Utc::now();
        let created = User {
            uuid: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role_uuid: Some(user.role_uuid),
            role: Some(role),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<User>> {
        let store = self.0.lock()?;
        Ok(store.users.iter().find(|u| u.uuid == uuid && !u.is_deleted()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.0.lock()?;
        Ok(store
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email) && !u.is_deleted())
            .cloned())
    }

    async fn update(&self, uuid: Uuid, changes: UserChanges) -> RepoResult<User> {
        let mut store = self.0.lock()?;
        if let Some(email) = changes.email.as_deref() {
            if email_taken(&store, email, Some(uuid)) {
                return Err(RepositoryError::UniqueViolation { field: "email".to_string() });
            }
        }
        let role = match changes.role_uuid {
            Some(id) => Some(role_type_of(&store, Some(id)).ok_or_else(|| {
                RepositoryError::ForeignKeyViolation { field: "role_uuid".to_string() }
            })?),
            None => None,
        };

        let user = store
            .users
            .iter_mut()
            .find(|u| u.uuid == uuid && !u.is_deleted())
            .ok_or(RepositoryError::NotFound)?;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(role_uuid) = changes.role_uuid {
            user.role_uuid = Some(role_uuid);
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn soft_delete(&self, uuid: Uuid) -> RepoResult<User> {
        let mut store = self.0.lock()?;
        let user = store
            .users
            .iter_mut()
            .find(|u| u.uuid == uuid && !u.is_deleted())
            .ok_or(RepositoryError::NotFound)?;
        let now = Utc::now();
        user.deleted_at = Some(now);
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn hard_delete(&self, uuid: Uuid) -> RepoResult<()> {
        let mut store = self.0.lock()?;
        let before = store.users.len();
        store.users.retain(|u| u.uuid != uuid);
        if store.users.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<User>> {
        let store = self.0.lock()?;
        let mut rows: Vec<User> = store
            .users
            .iter()
            .filter(|u| !u.is_deleted())
            .filter(|u| page.search.as_deref().map_or(true, |s| contains_ci(&u.name, s)))
            .cloned()
            .collect();
        newest_first(&mut rows, |u| u.created_at);
        Ok(paginate(rows, page))
    }

    async fn exists_with_role(&self, role: RoleType) -> RepoResult<bool> {
        let store = self.0.lock()?;
        Ok(store
            .users
            .iter()
            .any(|u| !u.is_deleted() && u.role == Some(role)))
    }
}

struct MemoryRoles(MemoryBackend);

#[async_trait]
impl RoleRepository for MemoryRoles {
    async fn create(&self, role: NewRole) -> RepoResult<Role> {
        let mut store = self.0.lock()?;
        if store.roles.iter().any(|r| r.role_type == role.role_type) {
            return Err(RepositoryError::UniqueViolation { field: "type".to_string() });
        }
        let now = Utc::now();
        let created = Role {
            uuid: Uuid::new_v4(),
            name: role.name,
            role_type: role.role_type,
            permissions: role.permissions,
            created_at: now,
            updated_at: now,
        };
        store.roles.push(created.clone());
        Ok(created)
    }

    async fn find_by_type(&self, role_type: RoleType) -> RepoResult<Option<Role>> {
        let store = self.0.lock()?;
        Ok(store.roles.iter().find(|r| r.role_type == role_type).cloned())
    }
}

struct MemoryAudits(MemoryBackend);

#[async_trait]
impl AuditRepository for MemoryAudits {
    async fn create(&self, record: NewAuditRecord) -> RepoResult<AuditRecord> {
        if self.0.audits_failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("audits table offline".to_string()));
        }
        let mut store = self.0.lock()?;
        let created = AuditRecord {
            uuid: Uuid::new_v4(),
            entity: record.entity,
            method: record.method,
            user_uuid: record.user_uuid,
            old_data: record.old_data,
            new_data: record.new_data,
            url: record.url,
            ip: record.ip,
            user_agent: record.user_agent,
            created_at: Utc::now(),
        };
        store.audits.push(created.clone());
        Ok(created)
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<AuditRecord>> {
        let store = self.0.lock()?;
        let mut rows: Vec<AuditRecord> = store
            .audits
            .iter()
            .filter(|a| {
                page.search
                    .as_deref()
                    .map_or(true, |s| contains_ci(&a.entity, s) || contains_ci(&a.method, s))
            })
            .cloned()
            .collect();
        newest_first(&mut rows, |a| a.created_at);
        Ok(paginate(rows, page))
    }
}

struct MemoryErrorLogs(MemoryBackend);

#[async_trait]
impl ErrorLogRepository for MemoryErrorLogs {
    async fn create(&self, record: NewErrorLog) -> RepoResult<ErrorLogRecord> {
        if self.0.error_logs_failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("error_logs table offline".to_string()));
        }
        let mut store = self.0.lock()?;
        let created = ErrorLogRecord {
            uuid: Uuid::new_v4(),
            error: record.error,
            status_code: record.status_code,
            status_text: record.status_text,
            method: record.method,
            path: record.path,
            ip: record.ip,
            user_agent: record.user_agent,
            created_at: Utc::now(),
        };
        store.error_logs.push(created.clone());
        Ok(created)
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<ErrorLogRecord>> {
        let store = self.0.lock()?;
        let mut rows: Vec<ErrorLogRecord> = store
            .error_logs
            .iter()
            .filter(|l| page.search.as_deref().map_or(true, |s| contains_ci(&l.error, s)))
            .cloned()
            .collect();
        newest_first(&mut rows, |l| l.created_at);
        Ok(paginate(rows, page))
    }
}

struct MemoryFiles(MemoryBackend);

#[async_trait]
impl FileRepository for MemoryFiles {
    async fn create(&self, file: NewFile) -> RepoResult<FileRecord> {
        let mut store = self.0.lock()?;
        if store.files.iter().any(|f| f.key == file.key) {
            return Err(RepositoryError::UniqueViolation { field: "key".to_string() });
        }
        let now = Utc::now();
        let created = FileRecord {
            uuid: Uuid::new_v4(),
            filename: file.filename,
            mimetype: file.mimetype,
            key: file.key,
            path: file.path,
            size: file.size,
            is_private: file.is_private,
            storage: file.storage,
            user_uuid: file.user_uuid,
            created_at: now,
            updated_at: now,
        };
        store.files.push(created.clone());
        Ok(created)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<FileRecord>> {
        if self.0.file_reads_failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("files table offline".to_string()));
        }
        let store = self.0.lock()?;
        Ok(store.files.iter().find(|f| f.uuid == uuid).cloned())
    }

    async fn delete(&self, uuid: Uuid) -> RepoResult<FileRecord> {
        let mut store = self.0.lock()?;
        let index = store
            .files
            .iter()
            .position(|f| f.uuid == uuid)
            .ok_or(RepositoryError::NotFound)?;
        Ok(store.files.remove(index))
    }
}

struct MemoryTemplates(MemoryBackend);

#[async_trait]
impl EmailTemplateRepository for MemoryTemplates {
    async fn create(&self, template: NewEmailTemplate) -> RepoResult<EmailTemplate> {
        let mut store = self.0.lock()?;
        if store.templates.iter().any(|t| t.name == template.name) {
            return Err(RepositoryError::UniqueViolation { field: "name".to_string() });
        }
        let now = Utc::now();
        let created = EmailTemplate {
            uuid: Uuid::new_v4(),
            name: template.name,
            subject: template.subject,
            body_html: template.body_html,
            body_text: template.body_text,
            variables: template.variables,
            category: template.category,
            description: template.description,
            is_active: template.is_active,
            version: template.version,
            created_at: now,
            updated_at: now,
        };
        store.templates.push(created.clone());
        Ok(created)
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<EmailTemplate>> {
        let store = self.0.lock()?;
        Ok(store.templates.iter().find(|t| t.name == name).cloned())
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<EmailTemplate>> {
        let store = self.0.lock()?;
        let mut rows: Vec<EmailTemplate> = store
            .templates
            .iter()
            .filter(|t| page.search.as_deref().map_or(true, |s| contains_ci(&t.name, s)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(rows, page))
    }
}

struct MemoryResets(MemoryBackend);

#[async_trait]
impl PasswordResetRepository for MemoryResets {
    async fn create(&self, request: NewPasswordReset) -> RepoResult<PasswordResetRequest> {
        let mut store = self.0.lock()?;
        let now = Utc::now();
        for older in store
            .resets
            .iter_mut()
            .filter(|r| r.user_uuid == request.user_uuid && r.used_at.is_none())
        {
            older.used_at = Some(now);
        }
        let created = PasswordResetRequest {
            uuid: Uuid::new_v4(),
            user_uuid: request.user_uuid,
            code_hash: request.code_hash,
            expires_at: request.expires_at,
            used_at: None,
            attempts: 0,
            created_at: now,
        };
        store.resets.push(created.clone());
        Ok(created)
    }

    async fn find_active(&self, user_uuid: Uuid, now: DateTime<Utc>) -> RepoResult<Option<PasswordResetRequest>> {
        let store = self.0.lock()?;
        Ok(store
            .resets
            .iter()
            .filter(|r| r.user_uuid == user_uuid && r.is_usable(now))
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn record_failed_attempt(&self, uuid: Uuid, max_attempts: i32) -> RepoResult<PasswordResetRequest> {
        let mut store = self.0.lock()?;
        let request = store
            .resets
            .iter_mut()
            .find(|r| r.uuid == uuid)
            .ok_or(RepositoryError::NotFound)?;
        request.attempts += 1;
        if request.attempts >= max_attempts && request.used_at.is_none() {
            request.used_at = Some(Utc::now());
        }
        Ok(request.clone())
    }

    async fn mark_used(&self, uuid: Uuid) -> RepoResult<()> {
        let mut store = self.0.lock()?;
        let request = store
            .resets
            .iter_mut()
            .find(|r| r.uuid == uuid && r.used_at.is_none())
            .ok_or(RepositoryError::NotFound)?;
        request.used_at = Some(Utc::now());
        Ok(())
    }
}
