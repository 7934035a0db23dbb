// handlers/protected/journal/history.rs - GET /api/requests/:id/history handler

use axum::extract::{Extension, Path, State};

use crate::database::models::HistoryEntry;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Principal;
use crate::state::AppState;

/// GET /api/requests/:id/history - Status transitions, oldest first
pub async fn history_list(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<HistoryEntry>> {
    let history = state.comments().list_history(id, &principal).await?;
    Ok(ApiResponse::success(history))
}
