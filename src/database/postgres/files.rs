use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::database::models::{FileRecord, NewFile};
use crate::database::repository::{FileRepository, RepoResult};
use crate::database::RepositoryError;

pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILE_COLUMNS: &str =
    "uuid, filename, mimetype, key, path, size, is_private, storage, user_uuid, created_at, updated_at";

fn file_from_row(row: &PgRow) -> Result<FileRecord, sqlx::Error> {
    Ok(FileRecord {
        uuid: row.try_get("uuid")?,
        filename: row.try_get("filename")?,
        mimetype: row.try_get("mimetype")?,
        key: row.try_get("key")?,
        path: row.try_get("path")?,
        size: row.try_get("size")?,
        is_private: row.try_get("is_private")?,
        storage: row.try_get("storage")?,
        user_uuid: row.try_get("user_uuid")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, file: NewFile) -> RepoResult<FileRecord> {
        let query = format!(
            "INSERT INTO files (filename, mimetype, key, path, size, is_private, storage, user_uuid)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            FILE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&file.filename)
            .bind(&file.mimetype)
            .bind(&file.key)
            .bind(&file.path)
            .bind(file.size)
            .bind(file.is_private)
            .bind(&file.storage)
            .bind(file.user_uuid)
            .fetch_one(&self.pool)
            .await?;

        Ok(file_from_row(&row)?)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> RepoResult<Option<FileRecord>> {
        let query = format!("SELECT {} FROM files WHERE uuid = $1", FILE_COLUMNS);
        let row = sqlx::query(&query).bind(uuid).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(file_from_row).transpose()?)
    }

    async fn delete(&self, uuid: Uuid) -> RepoResult<FileRecord> {
        let query = format!("DELETE FROM files WHERE uuid = $1 RETURNING {}", FILE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(file_from_row(&row)?)
    }
}
