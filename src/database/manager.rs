use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, ConfigError};
use crate::database::postgres;
use crate::database::repository::Repositories;

/// Errors from Database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Process-wide connection pool, opened at startup and closed on shutdown
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self, DatabaseError> {
        let raw_url = config.database_url()?;
        let url = url::Url::parse(raw_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.connection_timeout))
            .connect(raw_url)
            .await?;

        info!(
            "Connected to database {} (max {} connections)",
            url.path().trim_start_matches('/'),
            config.database.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded migrations under `migrations/`
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// PostgreSQL-backed repositories sharing this pool
    pub fn repositories(&self) -> Repositories {
        let pool = self.pool.clone();
        Repositories {
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            roles: Arc::new(postgres::PgRoleRepository::new(pool.clone())),
            audits: Arc::new(postgres::PgAuditRepository::new(pool.clone())),
            error_logs: Arc::new(postgres::PgErrorLogRepository::new(pool.clone())),
            files: Arc::new(postgres::PgFileRepository::new(pool.clone())),
            email_templates: Arc::new(postgres::PgEmailTemplateRepository::new(pool.clone())),
            password_resets: Arc::new(postgres::PgPasswordResetRepository::new(pool)),
        }
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}
