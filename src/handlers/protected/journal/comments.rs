// handlers/protected/journal/comments.rs - /api/requests/:id/comments handlers

use axum::extract::{Extension, Json, Path, State};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CommentView, Principal};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub text: String,
}

/// GET /api/requests/:id/comments - Oldest first, system events included
pub async fn comments_list(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<CommentView>> {
    let service = state.comments();
    let comments = service.list_comments(id, &principal).await?;
    Ok(ApiResponse::success(service.present_all(comments).await?))
}

/// POST /api/requests/:id/comments - `{text}`, refused on dead requests
pub async fn comment_create(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CommentBody>,
) -> ApiResult<CommentView> {
    let service = state.comments();
    let comment = service.add_comment(id, &body.text, &principal).await?;
    Ok(ApiResponse::created(service.present(comment).await?))
}
