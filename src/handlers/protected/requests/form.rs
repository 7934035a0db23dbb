// handlers/protected/requests/form.rs - multipart bodies of create and edit

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::ApiError;
use crate::handlers::parse_field;
use crate::services::Upload;

/// Text fields plus the optional `file` part
#[derive(Debug, Default)]
pub struct RequestForm {
    fields: HashMap<String, String>,
    pub file: Option<Upload>,
}

impl RequestForm {
    /// Reads every part; a file larger than `max_bytes` is a 413. An empty
    /// file part (no name or no bytes) counts as no file.
    pub async fn read(mut multipart: Multipart, max_bytes: usize) -> Result<Self, ApiError> {
        let mut form = RequestForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;

                if bytes.len() > max_bytes {
                    return Err(ApiError::payload_too_large(format!(
                        "Attachment exceeds the {} byte limit",
                        max_bytes
                    )));
                }
                form.file = file_name
                    .filter(|n| !n.trim().is_empty() && !bytes.is_empty())
                    .map(|file_name| Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
            } else {
                let text = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&str, ApiError> {
        self.optional(name)
            .ok_or_else(|| ApiError::invalid_field(name, "field is required"))
    }

    pub fn parse<T>(&self, name: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name).map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_field(name, value).map(Some),
        }
    }

    /// Checkbox-style flag: `true`, `1` or `on`
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.optional(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("true" | "1" | "on")
        )
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body too large")
    } else {
        ApiError::bad_request(err.body_text())
    }
}
