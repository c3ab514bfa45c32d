use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::{Database, Repositories};
use crate::services::{
    AuditService, AuthService, EmailService, EmailTemplateService, ErrorLogService, FileService,
    FileStorage, MailTransport, RoleService, UserService,
};

/// Everything a request handler or middleware can reach. Built once at
/// startup and cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    /// `None` when running on in-memory repositories.
    pub database: Option<Database>,
    pub tokens: TokenService,
    pub users: UserService,
    pub roles: RoleService,
    pub auth: AuthService,
    pub audits: AuditService,
    pub error_logs: ErrorLogService,
    pub files: FileService,
    pub templates: EmailTemplateService,
    pub mailer: EmailService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repos: Repositories,
        storage: Arc<dyn FileStorage>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let tokens = TokenService::new(&config.security);
        let users = UserService::new(repos.users.clone(), repos.roles.clone());
        let templates = EmailTemplateService::new(repos.email_templates.clone());
        let mailer = EmailService::new(templates.clone(), transport, config.mail.mail_from.clone());
        let auth = AuthService::new(
            &config,
            repos.users.clone(),
            repos.password_resets.clone(),
            users.clone(),
            mailer.clone(),
            tokens.clone(),
        );
        let files = FileService::new(repos.files.clone(), storage, config.storage.max_upload_bytes);

        Self {
            tokens,
            users,
            roles: RoleService::new(repos.roles.clone()),
            auth,
            audits: AuditService::new(repos.audits.clone()),
            error_logs: ErrorLogService::new(repos.error_logs.clone()),
            files,
            templates,
            mailer,
            database: None,
            repos,
            config: Arc::new(config),
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// False only when a configured database fails its ping.
    pub async fn database_healthy(&self) -> bool {
        match &self.database {
            Some(db) => match db.health_check().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Database health check failed: {}", e);
                    false
                }
            },
            None => true,
        }
    }
}
