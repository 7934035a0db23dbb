// handlers/elevated/admin/areas.rs - /api/admin/areas handlers

use axum::extract::{Extension, Json, Path, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::Area;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AreaSummary, AreaUpdate, Principal};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AreaBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// GET /api/admin/areas - All areas, inactive included
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<AreaSummary>> {
    principal.require_admin()?;
    let areas = state.catalog().list_areas(false).await?;
    Ok(ApiResponse::success(areas))
}

/// GET /api/admin/areas/:id
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<AreaSummary> {
    principal.require_admin()?;
    let area = state.catalog().get_area(id).await?;
    Ok(ApiResponse::success(area))
}

/// POST /api/admin/areas - `{name, description?}`
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AreaBody>,
) -> ApiResult<Area> {
    let name = body
        .name
        .ok_or_else(|| ApiError::invalid_field("name", "field is required"))?;
    let area = state.catalog().create_area(&name, body.description, &principal).await?;
    Ok(ApiResponse::created(area))
}

/// PUT /api/admin/areas/:id - `{name?, description?, active?}`
///
/// Deactivation cascades to the area's agents and is refused while the
/// area has open requests.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AreaBody>,
) -> ApiResult<AreaSummary> {
    let update = AreaUpdate {
        name: body.name,
        description: body.description,
        active: body.active,
    };
    let area = state.catalog().update_area(id, update, &principal).await?;
    Ok(ApiResponse::success(area))
}

/// DELETE /api/admin/areas/:id - Only unreferenced areas
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    state.catalog().delete_area(id, &principal).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
