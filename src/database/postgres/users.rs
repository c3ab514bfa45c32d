use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::snapshot;
use crate::database::models::{NewUser, RoleType, User, UserChanges};
use crate::database::repository::{like_pattern, PageSlice, RepoResult, UserRepository};
use crate::database::RepositoryError;
use crate::pagination::PageRequest;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Projection joining the role type onto a user row source (table or CTE).
fn select_from(source: &str) -> String {
    format!(
        r#"
        SELECT u.uuid, u.name, u.email, u.password_hash, u.role_uuid, r.type AS role_type,
               u.deleted_at, u.created_at, u.updated_at
        FROM {} u
        LEFT JOIN roles r ON r.uuid = u.role_uuid
        "#,
        source
    )
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let role = match row.try_get::<Option<String>, _>("role_type")? {
        Some(raw) => Some(raw.parse::<RoleType>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "role_type".to_string(),
            source: Box::new(e),
        })?),
        None => None,
    };

    Ok(User {
        uuid: row.try_get("uuid")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role_uuid: row.try_get("role_uuid")?,
        role,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let query = format!(
            "WITH inserted AS (
                INSERT INTO users (name, email, password_hash, role_uuid)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            ) {}",
            select_from("inserted")
        );

        let row = sqlx::query(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role_uuid)
            .fetch_one(&self.pool)
            .await?;

        Ok(user_from_row(&row)?)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<User>> {
        let query = format!("{} WHERE u.uuid = $1 AND u.deleted_at IS NULL", select_from("users"));
        let row = sqlx::query(&query).bind(uuid).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let query = format!(
            "{} WHERE lower(u.email) = lower($1) AND u.deleted_at IS NULL",
            select_from("users")
        );
        let row = sqlx::query(&query).bind(email).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn update(&self, uuid: Uuid, changes: UserChanges) -> RepoResult<User> {
        let query = format!(
            "WITH updated AS (
                UPDATE users SET
                    name = COALESCE($2, name),
                    email = COALESCE($3, email),
                    password_hash = COALESCE($4, password_hash),
                    role_uuid = COALESCE($5, role_uuid),
                    updated_at = NOW()
                WHERE uuid = $1 AND deleted_at IS NULL
                RETURNING *
            ) {}",
            select_from("updated")
        );

        let row = sqlx::query(&query)
            .bind(uuid)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.role_uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(user_from_row(&row)?)
    }

    async fn soft_delete(&self, uuid: Uuid) -> RepoResult<User> {
        let query = format!(
            "WITH deleted AS (
                UPDATE users SET deleted_at = NOW(), updated_at = NOW()
                WHERE uuid = $1 AND deleted_at IS NULL
                RETURNING *
            ) {}",
            select_from("deleted")
        );

        let row = sqlx::query(&query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(user_from_row(&row)?)
    }

    async fn hard_delete(&self, uuid: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<PageSlice<User>> {
        let pattern = page.search.as_deref().map(like_pattern);
        let mut tx = snapshot(&self.pool).await?;

        let query = format!(
            "{} WHERE u.deleted_at IS NULL AND ($1::text IS NULL OR u.name ILIKE $1)
             ORDER BY u.created_at DESC
             LIMIT $2 OFFSET $3",
            select_from("users")
        );
        let rows = sqlx::query(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users u WHERE u.deleted_at IS NULL AND ($1::text IS NULL OR u.name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((users, total))
    }

    async fn exists_with_role(&self, role: RoleType) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users u
                JOIN roles r ON r.uuid = u.role_uuid
                WHERE r.type = $1 AND u.deleted_at IS NULL
            )
            "#,
        )
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
