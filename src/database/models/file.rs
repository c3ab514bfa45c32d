use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Metadata of an uploaded object; bytes live in the storage backend under `key`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub uuid: Uuid,
    pub filename: String,
    pub mimetype: String,
    pub key: String,
    pub path: String,
    pub size: i64,
    pub is_private: bool,
    pub storage: String,
    pub user_uuid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub filename: String,
    pub mimetype: String,
    pub key: String,
    pub path: String,
    pub size: i64,
    pub is_private: bool,
    pub storage: String,
    pub user_uuid: Option<Uuid>,
}
