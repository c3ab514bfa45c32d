use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::snapshot;
use crate::database::models::{AuditRecord, NewAuditRecord};
use crate::database::repository::{like_pattern, AuditRepository, PageSlice, RepoResult};
use crate::pagination::PageRequest;

pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const AUDIT_COLUMNS: &str =
    "uuid, entity, method, user_uuid, old_data, new_data, url, ip, user_agent, created_at";

const AUDIT_FILTER: &str = "($1::text IS NULL OR entity ILIKE $1 OR method ILIKE $1)";

fn audit_from_row(row: &PgRow) -> Result<AuditRecord, sqlx::Error> {
    Ok(AuditRecord {
        uuid: row.try_get("uuid")?,
        entity: row.try_get("entity")?,
        method: row.try_get("method")?,
        user_uuid: row.try_get("user_uuid")?,
        old_data: row.try_get("old_data")?,
        new_data: row.try_get("new_data")?,
        url: row.try_get("url")?,
        ip: row.try_get("ip")?,
        user_agent: row.try_get("user_agent")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn create(&self, record: NewAuditRecord) -> RepoResult<AuditRecord> {
        let query = format!(
            "INSERT INTO audits (entity, method, user_uuid, old_data, new_data, url, ip, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            AUDIT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&record.entity)
            .bind(&record.method)
            .bind(record.user_uuid)
            .bind(&record.old_data)
            .bind(&record.new_data)
            .bind(&record.url)
            .bind(&record.ip)
            .bind(&record.user_agent)
            .fetch_one(&self.pool)
            .await?;

        Ok(audit_from_row(&row)?)
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<AuditRecord>> {
        let pattern = page.search.as_deref().map(like_pattern);
        let mut tx = snapshot(&self.pool).await?;

        let query = format!(
            "SELECT {} FROM audits WHERE {} ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            AUDIT_COLUMNS, AUDIT_FILTER
        );
        let rows = sqlx::query(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audits WHERE {}", AUDIT_FILTER))
            .bind(&pattern)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let records = rows.iter().map(audit_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }
}
