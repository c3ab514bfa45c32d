// handlers/audits.rs - /audits resource group

use axum::extract::{Query, State};

use crate::database::models::AuditRecord;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pagination::{ListQuery, PageRequest, Paginated};
use crate::routing::{Access, Endpoint, ResourceGroup, ADMIN};
use crate::state::AppState;

pub fn routes() -> ResourceGroup {
    ResourceGroup::new("audits").endpoint(Endpoint::get("/list", Access::Roles(ADMIN), list))
}

/// GET /audits/list - newest first, search on entity or method; dataPerPage is capped at 100
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Paginated<AuditRecord>> {
    let page = PageRequest::from(&query);
    Ok(ApiResponse::success(state.audits.list(&page).await?))
}
