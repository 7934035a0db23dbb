// handlers/protected/requests/edit.rs - PUT /api/requests/:id handler

use axum::extract::{Extension, Multipart, Path, State};

use super::form::RequestForm;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AttachmentChange, EditInput, Principal, RequestView};
use crate::state::AppState;
use crate::types::Priority;

/// PUT /api/requests/:id - Requester edits a New, unassigned request
///
/// Multipart fields are all optional: `subject`, `description`, `priority`,
/// `file` (replaces the attachment) and `removeAttachment`. A new file wins
/// over `removeAttachment`.
pub async fn request_edit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> ApiResult<RequestView> {
    let mut form = RequestForm::read(multipart, state.config.storage.max_attachment_bytes).await?;

    let attachment = match form.file.take() {
        Some(upload) => AttachmentChange::Replace(upload),
        None if form.flag("removeAttachment") => AttachmentChange::Remove,
        None => AttachmentChange::Keep,
    };
    let input = EditInput {
        subject: form.optional("subject").map(str::to_string),
        description: form.optional("description").map(str::to_string),
        priority: form.parse::<Priority>("priority")?,
        attachment,
    };

    let service = state.requests();
    let request = service.edit(id, input, &principal).await?;
    Ok(ApiResponse::success(service.present(request).await?))
}
