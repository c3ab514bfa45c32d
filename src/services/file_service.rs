use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{FileRecord, NewFile};
use crate::database::repository::FileRepository;
use crate::database::RepositoryError;
use crate::error::ApiError;

static ANY_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(pdf|doc|docx|xls|xlsx|txt|png|jpg|jpeg|gif|zip|rar|csv|json)$")
        .expect("upload pattern")
});
static AUDIO_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(mp3|wav|ogg|aac|flac|m4a)$").expect("audio pattern"));
static VIDEO_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(mp4|avi|mov|mkv|wmv|flv|webm)$").expect("video pattern"));
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("sanitize pattern"));

/// Upload endpoint flavour; each accepts its own filename extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Any,
    Audio,
    Video,
}

impl UploadKind {
    pub fn accepts(&self, filename: &str) -> bool {
        let pattern = match self {
            UploadKind::Any => &ANY_FILE,
            UploadKind::Audio => &AUDIO_FILE,
            UploadKind::Video => &VIDEO_FILE,
        };
        pattern.is_match(filename)
    }
}

/// Drops any client-side directory and replaces unsafe runs with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Bytes received from a multipart `file` field
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Where uploaded bytes live
#[async_trait]
pub trait FileStorage: Send + Sync {
    fn name(&self) -> &'static str;
    /// Stores `bytes` under `key`, returning the backend-specific path.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Local directory storage
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct FileService {
    files: Arc<dyn FileRepository>,
    storage: Arc<dyn FileStorage>,
    max_bytes: usize,
}

impl FileService {
    pub fn new(files: Arc<dyn FileRepository>, storage: Arc<dyn FileStorage>, max_bytes: usize) -> Self {
        Self {
            files,
            storage,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn upload(
        &self,
        kind: UploadKind,
        file: UploadedFile,
        is_private: bool,
        owner: Option<Uuid>,
    ) -> Result<FileRecord, ApiError> {
        if file.bytes.len() > self.max_bytes {
            return Err(ApiError::payload_too_large("File exceeds the maximum allowed size"));
        }
        if !kind.accepts(&file.filename) {
            return Err(ApiError::unsupported_media_type("Invalid or unsupported file format"));
        }

        let name = sanitize_file_name(&file.filename);
        let visibility = if is_private { "private" } else { "public" };
        let key = format!("{}/{}-{}", visibility, Utc::now().timestamp_millis(), name);

        let path = self.storage.put(&key, &file.bytes).await.map_err(|e| {
            tracing::error!("Failed to store upload {}: {}", key, e);
            ApiError::internal_server_error("Failed to store file")
        })?;

        let record = NewFile {
            filename: name,
            mimetype: file
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            key: key.clone(),
            path,
            size: file.bytes.len() as i64,
            is_private,
            storage: self.storage.name().to_string(),
            user_uuid: owner,
        };

        match self.files.create(record).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                // Keep storage and metadata in step
                if let Err(cleanup) = self.storage.remove(&key).await {
                    tracing::warn!("Orphaned upload {} left in storage: {}", key, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// Visible to any caller; `user_uuid` records the uploader but is not an ownership check.
    pub async fn find_by_uuid(&self, uuid: Uuid) -> Result<FileRecord, ApiError> {
        self.files
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(|| ApiError::not_found("File not found"))
    }

    /// Like `find_by_uuid`, not restricted to the uploader.
    pub async fn delete(&self, uuid: Uuid) -> Result<FileRecord, ApiError> {
        let removed = match self.files.delete(uuid).await {
            Ok(record) => record,
            Err(RepositoryError::NotFound) => return Err(ApiError::not_found("File not found")),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.storage.remove(&removed.key).await {
            tracing::warn!("Failed to remove stored bytes for {}: {}", removed.key, e);
        }
        Ok(removed)
    }

    pub async fn snapshot(&self, uuid: Uuid) -> Result<Option<Value>, ApiError> {
        let file = self.files.find_by_uuid(uuid).await?;
        Ok(file.and_then(|f| serde_json::to_value(f).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_filters() {
        assert!(UploadKind::Any.accepts("report.PDF"));
        assert!(UploadKind::Any.accepts("data.json"));
        assert!(!UploadKind::Any.accepts("script.exe"));
        assert!(!UploadKind::Any.accepts("song.mp3"));
        assert!(UploadKind::Audio.accepts("song.mp3"));
        assert!(UploadKind::Audio.accepts("voice.M4A"));
        assert!(!UploadKind::Audio.accepts("clip.mp4"));
        assert!(UploadKind::Video.accepts("clip.webm"));
        assert!(!UploadKind::Video.accepts("clip.webm.exe"));
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("my report (final).pdf"), "my_report_final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\ana\\foto ção.png"), "foto_o.png");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn local_storage_rejects_escaping_keys() {
        let storage = LocalStorage::new("/tmp/uploads");
        assert!(storage.resolve("public/1-a.txt").is_ok());
        assert!(storage.resolve("../secret").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
    }

    #[tokio::test]
    async fn local_storage_writes_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let path = storage.put("private/1-note.txt", b"hello").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");
        storage.remove("private/1-note.txt").await.unwrap();
        assert!(!Path::new(&path).exists());
        // Removing twice is fine
        storage.remove("private/1-note.txt").await.unwrap();
    }
}
