// handlers/protected/requests/show.rs - GET /api/requests/:id handlers

use axum::extract::{Extension, Path, State};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Download};
use crate::services::{Principal, RequestView};
use crate::state::AppState;

/// GET /api/requests/:id - 404 when missing, 403 when not visible to the caller
///
/// Names of area, type, requester and agent are resolved, comments included.
pub async fn request_show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<RequestView> {
    let view = state.requests().detail(id, &principal).await?;
    Ok(ApiResponse::success(view))
}

/// GET /api/requests/:id/attachment - Raw attachment bytes
pub async fn request_attachment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> Result<Download, ApiError> {
    let (attachment, bytes) = state.requests().attachment(id, &principal).await?;

    Ok(Download {
        content_type: attachment
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        file_name: attachment.file_name,
        bytes,
    })
}
