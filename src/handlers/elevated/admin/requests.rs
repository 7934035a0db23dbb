// handlers/elevated/admin/requests.rs - Administrator request views

use axum::extract::{Extension, State};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Principal, RequestView};
use crate::state::AppState;

/// GET /api/admin/requests/unassigned - New requests nobody has picked up
pub async fn unassigned(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<RequestView>> {
    let service = state.requests();
    let requests = service.list_unassigned(&principal).await?;
    Ok(ApiResponse::success(service.present_all(requests).await?))
}

/// GET /api/admin/requests/other - Requests of types without an area
pub async fn other(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<RequestView>> {
    let service = state.requests();
    let requests = service.list_other(&principal).await?;
    Ok(ApiResponse::success(service.present_all(requests).await?))
}
