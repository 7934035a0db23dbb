// handlers/protected/requests/create.rs - POST /api/requests handler

use axum::extract::{Extension, Multipart, State};

use super::form::RequestForm;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{NewRequestInput, Principal, RequestView};
use crate::state::AppState;
use crate::types::Priority;

/// POST /api/requests - Submit a new request
///
/// Multipart fields: `typeId`, `subject`, `description`, `priority`
/// (name or legacy code, default Medium) and an optional `file`. The area is
/// taken from the request type, the number is assigned by the server.
pub async fn request_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> ApiResult<RequestView> {
    let form = RequestForm::read(multipart, state.config.storage.max_attachment_bytes).await?;

    let type_id = form
        .parse::<i32>("typeId")?
        .ok_or_else(|| ApiError::invalid_field("typeId", "field is required"))?;
    let input = NewRequestInput {
        type_id,
        subject: form.required("subject")?.to_string(),
        description: form.required("description")?.to_string(),
        priority: form.parse::<Priority>("priority")?.unwrap_or(Priority::Medium),
        attachment: form.file,
    };

    let service = state.requests();
    let request = service.create(&principal, input).await?;
    Ok(ApiResponse::created(service.present(request).await?))
}
