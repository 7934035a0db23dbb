// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use axum::extract::{Extension, State};

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Principal;
use crate::state::AppState;

/// GET /api/auth/whoami - Current user as stored, not as the token claims it
pub async fn whoami(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<User> {
    let user = state.auth().current_user(&principal).await?;
    Ok(ApiResponse::success(user))
}
