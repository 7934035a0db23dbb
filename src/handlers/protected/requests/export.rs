// handlers/protected/requests/export.rs - GET /api/requests/:id/export/* handlers

use axum::extract::{Extension, Path, State};

use crate::error::ApiError;
use crate::middleware::Download;
use crate::services::Principal;
use crate::state::AppState;

/// GET /api/requests/:id/export/pdf - Same access rules as the comment thread
pub async fn request_export_pdf(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> Result<Download, ApiError> {
    Ok(state.exports().request_pdf(id, &principal).await?.into())
}

/// GET /api/requests/:id/export/png
pub async fn request_export_png(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> Result<Download, ApiError> {
    Ok(state.exports().request_png(id, &principal).await?.into())
}
