// handlers/elevated/admin/users.rs - /api/admin/users handlers (SuperAdministrador)

use axum::extract::{Extension, Json, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{User, UserDeletion};
use crate::handlers::{nullable, parse_field};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CreateUserInput, Principal, UpdateUserInput};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub area_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub area_id: Option<Option<i32>>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    pub password: String,
}

/// GET /api/admin/users[?role=AgenteArea]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RoleQuery>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<User>> {
    let role = query
        .role
        .as_deref()
        .map(|r| parse_field::<Role>("role", r))
        .transpose()?;
    let users = state.users().list(role, &principal).await?;
    Ok(ApiResponse::success(users))
}

/// GET /api/admin/users/:id
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<User> {
    let user = state.users().get(id, &principal).await?;
    Ok(ApiResponse::success(user))
}

/// POST /api/admin/users - `{username, displayName?, email, password, role, areaId?}`
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<User> {
    let input = CreateUserInput {
        username: body.username,
        display_name: body.display_name,
        email: body.email,
        password: body.password,
        role: parse_field("role", &body.role)?,
        area_id: body.area_id,
    };
    let user = state.users().create(input, &principal).await?;
    Ok(ApiResponse::created(user))
}

/// PUT /api/admin/users/:id - Every field optional; `areaId: null` clears the area
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<UpdateUserBody>,
) -> ApiResult<User> {
    let input = UpdateUserInput {
        username: body.username,
        display_name: body.display_name,
        email: body.email,
        role: body
            .role
            .as_deref()
            .map(|r| parse_field("role", r))
            .transpose()?,
        area_id: body.area_id,
        active: body.active,
    };
    let user = state.users().update(id, input, &principal).await?;
    Ok(ApiResponse::success(user))
}

/// POST /api/admin/users/:id/reset-password - `{password}`, at least 6 characters
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<PasswordBody>,
) -> ApiResult<Value> {
    state.users().reset_password(id, &body.password, &principal).await?;
    Ok(ApiResponse::success(json!({ "id": id, "passwordReset": true })))
}

/// DELETE /api/admin/users/:id[?force=true]
///
/// With `force`, assigned requests are detached and the user's comments and
/// history rows are deleted along with the account.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<DeleteQuery>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<UserDeletion> {
    let deletion = state.users().delete(id, query.force, &principal).await?;
    Ok(ApiResponse::success(deletion))
}
