use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::snapshot;
use crate::database::models::{EmailTemplate, NewEmailTemplate};
use crate::database::repository::{like_pattern, EmailTemplateRepository, PageSlice, RepoResult};
use crate::pagination::PageRequest;

pub struct PgEmailTemplateRepository {
    pool: PgPool,
}

impl PgEmailTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TEMPLATE_COLUMNS: &str = "uuid, name, subject, body_html, body_text, variables, category, \
     description, is_active, version, created_at, updated_at";

fn template_from_row(row: &PgRow) -> Result<EmailTemplate, sqlx::Error> {
    Ok(EmailTemplate {
        uuid: row.try_get("uuid")?,
        name: row.try_get("name")?,
        subject: row.try_get("subject")?,
        body_html: row.try_get("body_html")?,
        body_text: row.try_get("body_text")?,
        variables: row.try_get("variables")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl EmailTemplateRepository for PgEmailTemplateRepository {
    async fn create(&self, template: NewEmailTemplate) -> RepoResult<EmailTemplate> {
        let query = format!(
            "INSERT INTO email_templates
                (name, subject, body_html, body_text, variables, category, description, is_active, version)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            TEMPLATE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&template.name)
            .bind(&template.subject)
            .bind(&template.body_html)
            .bind(&template.body_text)
            .bind(&template.variables)
            .bind(&template.category)
            .bind(&template.description)
            .bind(template.is_active)
            .bind(template.version)
            .fetch_one(&self.pool)
            .await?;

        Ok(template_from_row(&row)?)
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<EmailTemplate>> {
        let query = format!("SELECT {} FROM email_templates WHERE name = $1", TEMPLATE_COLUMNS);
        let row = sqlx::query(&query).bind(name).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(template_from_row).transpose()?)
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<EmailTemplate>> {
        let pattern = page.search.as_deref().map(like_pattern);
        let mut tx = snapshot(&self.pool).await?;

        let query = format!(
            "SELECT {} FROM email_templates
             WHERE ($1::text IS NULL OR name ILIKE $1)
             ORDER BY name
             LIMIT $2 OFFSET $3",
            TEMPLATE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_templates WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let templates = rows.iter().map(template_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((templates, total))
    }
}
