// handlers/elevated/admin/request_types.rs - /api/admin/request-types handlers

use axum::extract::{Extension, Json, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::RequestType;
use crate::error::ApiError;
use crate::handlers::nullable;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Principal, RequestTypeUpdate};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeQuery {
    pub area_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTypeBody {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `null` files the type under "Other"
    #[serde(default, deserialize_with = "nullable")]
    pub area_id: Option<Option<i32>>,
    pub active: Option<bool>,
}

/// GET /api/admin/request-types[?areaId] - Inactive types included
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<TypeQuery>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<RequestType>> {
    principal.require_admin()?;
    let types = state.catalog().list_request_types(query.area_id, false).await?;
    Ok(ApiResponse::success(types))
}

/// GET /api/admin/request-types/:id
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<RequestType> {
    principal.require_admin()?;
    let request_type = state.catalog().get_request_type(id).await?;
    Ok(ApiResponse::success(request_type))
}

/// POST /api/admin/request-types - `{name, description?, areaId?}`
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<RequestTypeBody>,
) -> ApiResult<RequestType> {
    let name = body
        .name
        .ok_or_else(|| ApiError::invalid_field("name", "field is required"))?;
    let request_type = state
        .catalog()
        .create_request_type(&name, body.description, body.area_id.flatten(), &principal)
        .await?;
    Ok(ApiResponse::created(request_type))
}

/// PUT /api/admin/request-types/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<RequestTypeBody>,
) -> ApiResult<RequestType> {
    let update = RequestTypeUpdate {
        name: body.name,
        description: body.description,
        area_id: body.area_id,
        active: body.active,
    };
    let request_type = state.catalog().update_request_type(id, update, &principal).await?;
    Ok(ApiResponse::success(request_type))
}

/// POST /api/admin/request-types/:id/toggle - Flip the active flag
pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<RequestType> {
    let request_type = state.catalog().toggle_request_type(id, &principal).await?;
    Ok(ApiResponse::success(request_type))
}

/// DELETE /api/admin/request-types/:id - Refused while requests use the type
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    state.catalog().delete_request_type(id, &principal).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
