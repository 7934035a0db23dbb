// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::{Json, State};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::LoginResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/login - Authenticate user and receive JWT token
///
/// Expected Input:
/// ```json
/// { "username": "alice", "password": "..." }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "user": { "id": 6, "username": "alice", "role": "Usuario", ... },
///     "expiresIn": 86400
///   }
/// }
/// ```
///
/// Unknown users, inactive users and wrong passwords all answer 401 with the
/// same message.
pub async fn login_post(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let login = state.auth().login(&payload.username, &payload.password).await?;
    Ok(ApiResponse::success(login))
}
