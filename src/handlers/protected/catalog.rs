// handlers/protected/catalog.rs - /api/catalog/* handlers
//
// Read-only pickers for any authenticated user; inactive entries are hidden.

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::database::models::{RequestType, User};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AreaSummary, PriorityInfo};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeQuery {
    pub area_id: Option<i32>,
}

/// GET /api/catalog/areas - Active areas
pub async fn catalog_areas(State(state): State<AppState>) -> ApiResult<Vec<AreaSummary>> {
    let areas = state.catalog().list_areas(true).await?;
    Ok(ApiResponse::success(areas))
}

/// GET /api/catalog/areas/:id/agents - Active agents of an area
pub async fn catalog_area_agents(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Vec<User>> {
    let agents = state.catalog().area_agents(id).await?;
    Ok(ApiResponse::success(agents))
}

/// GET /api/catalog/request-types[?areaId] - Active request types
pub async fn catalog_request_types(
    State(state): State<AppState>,
    Query(query): Query<TypeQuery>,
) -> ApiResult<Vec<RequestType>> {
    let types = state.catalog().list_request_types(query.area_id, true).await?;
    Ok(ApiResponse::success(types))
}

/// GET /api/catalog/priorities
pub async fn catalog_priorities(State(state): State<AppState>) -> ApiResult<Vec<PriorityInfo>> {
    Ok(ApiResponse::success(state.catalog().priorities()))
}
