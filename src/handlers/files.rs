// handlers/files.rs - /files resource group

use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, Query, State},
    http::StatusCode,
};
use futures::{future::BoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::UuidQuery;
use crate::database::models::FileRecord;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::routing::{Access, AuditTarget, Endpoint, ResourceGroup};
use crate::services::{UploadKind, UploadedFile};
use crate::state::AppState;

/// Room for multipart boundaries and the `isPrivate` field on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes(max_upload_bytes: usize) -> ResourceGroup {
    let limit = max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    ResourceGroup::new("files")
        .audited(AuditTarget::new("files").with_snapshot(snapshot))
        .endpoint(Endpoint::post("/create", Access::AUTHENTICATED, upload_any).with_body_limit(limit))
        .endpoint(Endpoint::post("/audio", Access::AUTHENTICATED, upload_audio).with_body_limit(limit))
        .endpoint(Endpoint::post("/video", Access::AUTHENTICATED, upload_video).with_body_limit(limit))
        .endpoint(Endpoint::get("/find-by-uuid", Access::AUTHENTICATED, find_by_uuid))
        .endpoint(Endpoint::delete("/delete", Access::AUTHENTICATED, delete))
}

/// `?isPrivate=` on the upload routes; takes precedence over the form field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub is_private: Option<String>,
}

impl UploadQuery {
    /// Only `true` and `false` are accepted, any other value is a 400.
    pub fn is_private(&self) -> Result<Option<bool>, ApiError> {
        match self.is_private.as_deref().map(str::trim) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(ApiError::bad_request(format!(
                "Validation failed (boolean string is expected): isPrivate={}",
                other
            ))),
        }
    }
}

fn snapshot(state: AppState, uuid: Uuid) -> BoxFuture<'static, Result<Option<Value>, ApiError>> {
    async move { state.files.snapshot(uuid).await }.boxed()
}

/// POST /files/create?isPrivate=
pub async fn upload_any(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> ApiResult<FileRecord> {
    upload(state, identity, UploadKind::Any, query, multipart).await
}

/// POST /files/audio?isPrivate=
pub async fn upload_audio(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> ApiResult<FileRecord> {
    upload(state, identity, UploadKind::Audio, query, multipart).await
}

/// POST /files/video?isPrivate=
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> ApiResult<FileRecord> {
    upload(state, identity, UploadKind::Video, query, multipart).await
}

async fn upload(
    state: AppState,
    identity: Identity,
    kind: UploadKind,
    query: UploadQuery,
    multipart: Multipart,
) -> ApiResult<FileRecord> {
    let from_query = query.is_private()?;
    let (file, from_form) = read_upload(multipart).await?;
    let is_private = from_query.unwrap_or(from_form);
    let record = state
        .files
        .upload(kind, file, is_private, Some(identity.user.uuid))
        .await?;
    Ok(ApiResponse::created(record))
}

/// Pulls the `file` part and the optional `isPrivate` flag out of the form.
async fn read_upload(mut multipart: Multipart) -> Result<(UploadedFile, bool), ApiError> {
    let mut file = None;
    let mut is_private = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("isPrivate") => {
                let value = field.text().await.map_err(multipart_error)?;
                is_private = matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1");
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    Ok((file, is_private))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("File exceeds the maximum allowed size")
    } else {
        ApiError::bad_request(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// GET /files/find-by-uuid?uuid= - any authenticated user, ownership is not enforced
pub async fn find_by_uuid(State(state): State<AppState>, Query(query): Query<UuidQuery>) -> ApiResult<FileRecord> {
    Ok(ApiResponse::success(state.files.find_by_uuid(query.parse()?).await?))
}

/// DELETE /files/delete?uuid= - removes the row and the stored bytes; ownership is not enforced
pub async fn delete(State(state): State<AppState>, Query(query): Query<UuidQuery>) -> ApiResult<FileRecord> {
    Ok(ApiResponse::success(state.files.delete(query.parse()?).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(value: Option<&str>) -> UploadQuery {
        UploadQuery {
            is_private: value.map(str::to_string),
        }
    }

    #[test]
    fn is_private_accepts_only_boolean_strings() {
        assert_eq!(query(None).is_private().unwrap(), None);
        assert_eq!(query(Some("true")).is_private().unwrap(), Some(true));
        assert_eq!(query(Some("false")).is_private().unwrap(), Some(false));

        let err = query(Some("yes")).is_private().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().contains("boolean string is expected"));
    }
}
