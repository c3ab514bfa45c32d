use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::database::models::{NewRole, Role, RoleType};
use crate::database::repository::{RepoResult, RoleRepository};

pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ROLE_COLUMNS: &str = "uuid, name, type, permissions, created_at, updated_at";

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    let raw: String = row.try_get("type")?;
    let role_type = raw.parse::<RoleType>().map_err(|e| sqlx::Error::ColumnDecode {
        index: "type".to_string(),
        source: Box::new(e),
    })?;

    Ok(Role {
        uuid: row.try_get("uuid")?,
        name: row.try_get("name")?,
        role_type,
        permissions: row.try_get("permissions")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn create(&self, role: NewRole) -> RepoResult<Role> {
        let query = format!(
            "INSERT INTO roles (name, type, permissions) VALUES ($1, $2, $3) RETURNING {}",
            ROLE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(&role.name)
            .bind(role.role_type.as_str())
            .bind(&role.permissions)
            .fetch_one(&self.pool)
            .await?;
        Ok(role_from_row(&row)?)
    }

    async fn find_by_type(&self, role_type: RoleType) -> RepoResult<Option<Role>> {
        let query = format!("SELECT {} FROM roles WHERE type = $1", ROLE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(role_type.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(role_from_row).transpose()?)
    }
}
