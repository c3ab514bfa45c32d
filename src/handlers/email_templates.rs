// handlers/email_templates.rs - /email-templates resource group

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::database::models::{EmailTemplate, NewEmailTemplate};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pagination::{ListQuery, PageRequest, Paginated};
use crate::routing::{Access, AuditTarget, Endpoint, ResourceGroup, ADMIN};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

pub fn routes() -> ResourceGroup {
    ResourceGroup::new("email-templates")
        .audited(AuditTarget::new("email-templates"))
        .endpoint(Endpoint::post("/create", Access::Roles(ADMIN), create))
        .endpoint(Endpoint::get("/list", Access::Roles(ADMIN), list))
        .endpoint(Endpoint::get("/find-by-name", Access::Roles(ADMIN), find_by_name))
}

/// POST /email-templates/create
pub async fn create(
    State(state): State<AppState>,
    Json(dto): Json<NewEmailTemplate>,
) -> ApiResult<EmailTemplate> {
    Ok(ApiResponse::created(state.templates.create(dto).await?))
}

/// GET /email-templates/list - ordered by name; dataPerPage is capped at 100
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Paginated<EmailTemplate>> {
    let page = PageRequest::from(&query);
    Ok(ApiResponse::success(state.templates.list(&page).await?))
}

/// GET /email-templates/find-by-name?name=
pub async fn find_by_name(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> ApiResult<EmailTemplate> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter 'name' is required"))?;
    Ok(ApiResponse::success(state.templates.find_by_name(name).await?))
}
