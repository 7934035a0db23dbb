// handlers/protected/requests/list.rs - Request listings

use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;

use crate::database::models::RequestFilter;
use crate::handlers::parse_field;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Principal, RequestView};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub area_id: Option<i32>,
    #[serde(default)]
    pub unassigned: bool,
}

impl ListQuery {
    fn into_filter(self) -> Result<RequestFilter, crate::error::ApiError> {
        Ok(RequestFilter {
            status: self.status.as_deref().map(|s| parse_field("status", s)).transpose()?,
            priority: self
                .priority
                .as_deref()
                .map(|p| parse_field("priority", p))
                .transpose()?,
            area_id: self.area_id,
            unassigned_only: self.unassigned,
            ..Default::default()
        })
    }
}

/// GET /api/requests - Every request (administrators), newest first
///
/// Query: `status`, `priority`, `areaId`, `unassigned=true`
pub async fn requests_list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<RequestView>> {
    let filter = query.into_filter()?;
    let service = state.requests();
    let requests = service.list_all(&principal, filter).await?;
    Ok(ApiResponse::success(service.present_all(requests).await?))
}

/// GET /api/requests/mine - Requests submitted by the caller
pub async fn requests_mine(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<RequestView>> {
    let service = state.requests();
    let requests = service.list_mine(&principal).await?;
    Ok(ApiResponse::success(service.present_all(requests).await?))
}

/// GET /api/requests/area - Work inbox: all requests for administrators,
/// the own area for agents
pub async fn requests_inbox(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<RequestView>> {
    let service = state.requests();
    let requests = service.list_inbox(&principal).await?;
    Ok(ApiResponse::success(service.present_all(requests).await?))
}

/// GET /api/requests/area/:area_id
pub async fn requests_by_area(
    State(state): State<AppState>,
    Path(area_id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<RequestView>> {
    let service = state.requests();
    let requests = service.list_by_area(area_id, &principal).await?;
    Ok(ApiResponse::success(service.present_all(requests).await?))
}
