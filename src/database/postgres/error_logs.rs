use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::snapshot;
use crate::database::models::{ErrorLogRecord, NewErrorLog};
use crate::database::repository::{like_pattern, ErrorLogRepository, PageSlice, RepoResult};
use crate::pagination::PageRequest;

pub struct PgErrorLogRepository {
    pool: PgPool,
}

impl PgErrorLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LOG_COLUMNS: &str =
    "uuid, error, status_code, status_text, method, path, ip, user_agent, created_at";

fn log_from_row(row: &PgRow) -> Result<ErrorLogRecord, sqlx::Error> {
    Ok(ErrorLogRecord {
        uuid: row.try_get("uuid")?,
        error: row.try_get("error")?,
        status_code: row.try_get("status_code")?,
        status_text: row.try_get("status_text")?,
        method: row.try_get("method")?,
        path: row.try_get("path")?,
        ip: row.try_get("ip")?,
        user_agent: row.try_get("user_agent")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ErrorLogRepository for PgErrorLogRepository {
    async fn create(&self, record: NewErrorLog) -> RepoResult<ErrorLogRecord> {
        let query = format!(
            "INSERT INTO error_logs (error, status_code, status_text, method, path, ip, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            LOG_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&record.error)
            .bind(record.status_code)
            .bind(&record.status_text)
            .bind(&record.method)
            .bind(&record.path)
            .bind(&record.ip)
            .bind(&record.user_agent)
            .fetch_one(&self.pool)
            .await?;

        Ok(log_from_row(&row)?)
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<ErrorLogRecord>> {
        let pattern = page.search.as_deref().map(like_pattern);
        let mut tx = snapshot(&self.pool).await?;

        let query = format!(
            "SELECT {} FROM error_logs
             WHERE ($1::text IS NULL OR error ILIKE $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
            LOG_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM error_logs WHERE ($1::text IS NULL OR error ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let records = rows.iter().map(log_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }
}
