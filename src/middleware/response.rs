use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::error::ApiError;
use crate::services::ExportedFile;

/// Successful handler output, rendered as `{success: true, data}`
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub data: T,
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    data: &'a T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    /// 201 for newly stored requests, comments and catalog entries
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            success: true,
            data: &self.data,
        };
        // Serialize up front so a failure still yields the error body
        match serde_json::to_value(&envelope) {
            Ok(body) => (self.status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                ApiError::internal("Failed to serialize response data").into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Raw file body sent as an attachment, outside the JSON envelope
#[derive(Debug)]
pub struct Download {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl IntoResponse for Download {
    fn into_response(self) -> Response {
        let file_name = self.file_name.replace(['"', '\\', '\r', '\n'], "_");
        let disposition = format!("attachment; filename=\"{}\"", file_name);
        (
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

impl From<ExportedFile> for Download {
    fn from(file: ExportedFile) -> Self {
        Self {
            content_type: file.content_type.to_string(),
            file_name: file.file_name,
            bytes: file.bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn body_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn created_wraps_data_in_the_envelope() {
        let response = ApiResponse::created(json!({"number": "SOL-2026-0001"})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_of(response).await,
            json!({"success": true, "data": {"number": "SOL-2026-0001"}})
        );
    }

    #[tokio::test]
    async fn empty_lists_are_still_enveloped() {
        let response = ApiResponse::success(Vec::<i32>::new()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await["data"], json!([]));
    }

    #[tokio::test]
    async fn downloads_skip_the_envelope_and_sanitize_names() {
        let response = Download {
            content_type: "application/pdf".into(),
            file_name: "Solicitud_\"SOL\"\r\n.pdf".into(),
            bytes: b"%PDF-1.4".to_vec(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Solicitud__SOL___.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4");
    }
}
