// handlers/protected/requests/workflow.rs - Lifecycle transition handlers

use axum::extract::{Extension, Json, Path, State};
use serde::Deserialize;

use crate::handlers::parse_field;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Principal, RequestView};
use crate::state::AppState;
use crate::types::RequestStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub agent_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub status: String,
    pub note: Option<String>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseBody {
    pub note: Option<String>,
}

/// POST /api/requests/:id/take - Agent self-assigns a New request of their area
pub async fn request_take(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<RequestView> {
    let service = state.requests();
    let request = service.take(id, &principal).await?;
    Ok(ApiResponse::success(service.present(request).await?))
}

/// POST /api/requests/:id/assign - Administrator (re)assigns an agent
pub async fn request_assign(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AssignBody>,
) -> ApiResult<RequestView> {
    let service = state.requests();
    let request = service.assign(id, body.agent_id, &principal).await?;
    Ok(ApiResponse::success(service.present(request).await?))
}

/// POST /api/requests/:id/unassign - Administrator or the assignee drops the assignment
pub async fn request_unassign(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<RequestView> {
    let service = state.requests();
    let request = service.unassign(id, &principal).await?;
    Ok(ApiResponse::success(service.present(request).await?))
}

/// PUT /api/requests/:id/status - `{status, note?, rejectionReason?}`
pub async fn request_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<StatusBody>,
) -> ApiResult<RequestView> {
    let status: RequestStatus = parse_field("status", &body.status)?;
    let service = state.requests();
    let request = service
        .change_status(
            id,
            status,
            body.note.as_deref(),
            body.rejection_reason.as_deref(),
            &principal,
        )
        .await?;
    Ok(ApiResponse::success(service.present(request).await?))
}

/// POST /api/requests/:id/reject - `{reason}`; a blank reason is refused
pub async fn request_reject(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<RejectBody>,
) -> ApiResult<RequestView> {
    let service = state.requests();
    let request = service.reject(id, &body.reason, &principal).await?;
    Ok(ApiResponse::success(service.present(request).await?))
}

/// POST /api/requests/:id/close - Requester confirms a Resolved request
///
/// The body is optional; `{note}` replaces the default closing comment.
pub async fn request_close(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    body: Option<Json<CloseBody>>,
) -> ApiResult<RequestView> {
    let Json(body) = body.unwrap_or_default();
    let service = state.requests();
    let request = service.close(id, body.note.as_deref(), &principal).await?;
    Ok(ApiResponse::success(service.present(request).await?))
}
