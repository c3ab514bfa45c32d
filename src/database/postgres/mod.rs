//! PostgreSQL implementations of the repository traits.
//!
//! Paged reads run their page query and their count inside one
//! `REPEATABLE READ` transaction so both observe the same snapshot.

mod audits;
mod email_templates;
mod error_logs;
mod files;
mod password_resets;
mod roles;
mod users;

pub use audits::PgAuditRepository;
pub use email_templates::PgEmailTemplateRepository;
pub use error_logs::PgErrorLogRepository;
pub use files::PgFileRepository;
pub use password_resets::PgPasswordResetRepository;
pub use roles::PgRoleRepository;
pub use users::PgUserRepository;

use sqlx::{PgPool, Postgres, Transaction};

/// Opens a transaction whose reads share one snapshot.
pub(crate) async fn snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
