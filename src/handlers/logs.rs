// handlers/logs.rs - /logs resource group

use axum::extract::{Query, State};

use crate::database::models::ErrorLogRecord;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pagination::{ListQuery, PageRequest, Paginated};
use crate::routing::{Access, Endpoint, ResourceGroup, ADMIN};
use crate::state::AppState;

pub fn routes() -> ResourceGroup {
    ResourceGroup::new("logs").endpoint(Endpoint::get("/list", Access::Roles(ADMIN), list))
}

/// GET /logs/list - newest first; dataPerPage is capped at 100
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Paginated<ErrorLogRecord>> {
    let page = PageRequest::from(&query);
    Ok(ApiResponse::success(state.error_logs.list(&page).await?))
}
