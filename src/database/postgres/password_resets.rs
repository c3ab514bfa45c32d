use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::database::models::{NewPasswordReset, PasswordResetRequest};
use crate::database::repository::{PasswordResetRepository, RepoResult};
use crate::database::RepositoryError;

pub struct PgPasswordResetRepository {
    pool: PgPool,
}

impl PgPasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESET_COLUMNS: &str = "uuid, user_uuid, code_hash, expires_at, used_at, attempts, created_at";

fn reset_from_row(row: &PgRow) -> Result<PasswordResetRequest, sqlx::Error> {
    Ok(PasswordResetRequest {
        uuid: row.try_get("uuid")?,
        user_uuid: row.try_get("user_uuid")?,
        code_hash: row.try_get("code_hash")?,
        expires_at: row.try_get("expires_at")?,
        used_at: row.try_get("used_at")?,
        attempts: row.try_get("attempts")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl PasswordResetRepository for PgPasswordResetRepository {
    async fn create(&self, request: NewPasswordReset) -> RepoResult<PasswordResetRequest> {
        let mut tx = self.pool.begin().await?;

        // Only the newest code stays redeemable
        sqlx::query(
            "UPDATE password_reset_requests SET used_at = NOW()
             WHERE user_uuid = $1 AND used_at IS NULL",
        )
        .bind(request.user_uuid)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO password_reset_requests (user_uuid, code_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {}",
            RESET_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(request.user_uuid)
            .bind(&request.code_hash)
            .bind(request.expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(reset_from_row(&row)?)
    }

    async fn find_active(
        &self,
        user_uuid: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<PasswordResetRequest>> {
        let query = format!(
            "SELECT {} FROM password_reset_requests
             WHERE user_uuid = $1 AND used_at IS NULL AND expires_at > $2
             ORDER BY created_at DESC
             LIMIT 1",
            RESET_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(user_uuid)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(reset_from_row).transpose()?)
    }

    async fn record_failed_attempt(&self, uuid: Uuid, max_attempts: i32) -> RepoResult<PasswordResetRequest> {
        let query = format!(
            "UPDATE password_reset_requests SET
                attempts = attempts + 1,
                used_at = CASE WHEN attempts + 1 >= $2 THEN NOW() ELSE used_at END
             WHERE uuid = $1
             RETURNING {}",
            RESET_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(uuid)
            .bind(max_attempts)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(reset_from_row(&row)?)
    }

    async fn mark_used(&self, uuid: Uuid) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE password_reset_requests SET used_at = NOW() WHERE uuid = $1 AND used_at IS NULL",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
