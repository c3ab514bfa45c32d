// handlers/users.rs - /users resource group

use axum::{
    extract::{Query, State},
    response::Json,
};
use futures::{future::BoxFuture, FutureExt};
use serde_json::Value;
use uuid::Uuid;

use super::UuidQuery;
use crate::database::models::{CreateUserDto, UpdateUserDto, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pagination::{ListQuery, PageRequest, Paginated};
use crate::routing::{Access, AuditTarget, Endpoint, ResourceGroup, ADMIN, ADMIN_OR_MANAGER};
use crate::services::user_service::DeleteUserResponse;
use crate::state::AppState;

pub fn routes() -> ResourceGroup {
    ResourceGroup::new("users")
        .audited(AuditTarget::new("users").with_snapshot(snapshot))
        .endpoint(Endpoint::post("/create", Access::Roles(ADMIN), create))
        .endpoint(Endpoint::get("/find-by-uuid", Access::AUTHENTICATED, find_by_uuid))
        .endpoint(Endpoint::get("/list", Access::Roles(ADMIN_OR_MANAGER), list))
        .endpoint(Endpoint::put("/update", Access::Roles(ADMIN), update))
        .endpoint(Endpoint::patch("/patch", Access::Roles(ADMIN), update))
        .endpoint(Endpoint::delete("/delete", Access::Roles(ADMIN), delete))
        .endpoint(Endpoint::delete("/hard-delete", Access::Roles(ADMIN), hard_delete))
}

fn snapshot(state: AppState, uuid: Uuid) -> BoxFuture<'static, Result<Option<Value>, ApiError>> {
    async move { state.users.snapshot(uuid).await }.boxed()
}

/// POST /users/create
pub async fn create(State(state): State<AppState>, Json(dto): Json<CreateUserDto>) -> ApiResult<User> {
    Ok(ApiResponse::created(state.users.create(dto).await?))
}

/// GET /users/find-by-uuid?uuid=
pub async fn find_by_uuid(State(state): State<AppState>, Query(query): Query<UuidQuery>) -> ApiResult<User> {
    let user = state.users.find_by_uuid(query.parse()?).await?;
    Ok(ApiResponse::success(user))
}

/// GET /users/list?page=&dataPerPage=&search= - dataPerPage is capped at 100
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Paginated<User>> {
    let page = PageRequest::from(&query);
    Ok(ApiResponse::success(state.users.list(&page).await?))
}

/// PUT /users/update?uuid= and PATCH /users/patch?uuid= - only present fields change
pub async fn update(
    State(state): State<AppState>,
    Query(query): Query<UuidQuery>,
    Json(dto): Json<UpdateUserDto>,
) -> ApiResult<User> {
    let user = state.users.update(query.parse()?, dto).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /users/delete?uuid= - soft delete
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<UuidQuery>,
) -> ApiResult<DeleteUserResponse> {
    Ok(ApiResponse::success(state.users.delete(query.parse()?).await?))
}

/// DELETE /users/hard-delete?uuid=
pub async fn hard_delete(
    State(state): State<AppState>,
    Query(query): Query<UuidQuery>,
) -> ApiResult<DeleteUserResponse> {
    Ok(ApiResponse::success(state.users.hard_delete(query.parse()?).await?))
}
