// Boundary error: every failure leaving a handler becomes one of these
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::blob::BlobError;
use crate::database::manager::DatabaseError;
use crate::services::ServiceError;

const UNAVAILABLE: &str = "Database temporarily unavailable";

/// Error response rendered as `{statusCode, message, details?}`.
///
/// `message` is always safe to show a client; anything internal is logged
/// where the error is converted and replaced by a generic text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(serialize_with = "status_as_u16")]
    pub status_code: StatusCode,
    pub message: String,
    /// Field name to problem, for form and body validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

fn status_as_u16<S: serde::Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

impl ApiError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 400 naming the offending field in `details`
    pub fn invalid_field(field: &str, problem: impl Into<String>) -> Self {
        let problem = problem.into();
        let mut err = Self::bad_request(format!("Invalid field '{}': {}", field, problem));
        err.details = Some(BTreeMap::from([(field.to_string(), problem)]));
        err
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::unavailable(UNAVAILABLE)
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
                tracing::error!("Database unreachable: {}", err);
                ApiError::unavailable(UNAVAILABLE)
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::unavailable("Schema migration in progress, please retry")
            }
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::internal("Database error occurred")
            }
        }
    }
}

impl From<BlobError> for ApiError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(_) => ApiError::not_found("Attachment not found"),
            other => {
                tracing::error!("Attachment storage error: {}", other);
                ApiError::internal("Attachment storage error")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Business(msg) => ApiError::bad_request(msg),
            ServiceError::UnauthorizedAction(msg) => ApiError::forbidden(msg),
            ServiceError::Unauthenticated(msg) => ApiError::unauthorized(msg),
            // Retried inside the services; one that escapes is a bug
            ServiceError::Conflict(what) => {
                tracing::error!("Unhandled version conflict on {}", what);
                ApiError::internal("The request changed concurrently, please retry")
            }
            ServiceError::Database(e) => e.into(),
            ServiceError::Blob(e) => e.into(),
            ServiceError::Password(e) => {
                tracing::error!("{}", e);
                ApiError::internal("Failed to store credentials")
            }
            ServiceError::Render(e) => {
                tracing::error!("Export failed: {}", e);
                ApiError::internal("Failed to generate the document")
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, Json(&self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::business("Reason is required"), 400),
            (ServiceError::unauthenticated("Missing token"), 401),
            (ServiceError::forbidden("Not yours"), 403),
            (ServiceError::not_found("Request 9 not found"), 404),
            (ServiceError::Conflict("request 9".into()), 500),
            (ServiceError::Render(crate::render::RenderError::Task("panicked".into())), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code.as_u16(), status);
        }
    }

    #[test]
    fn body_carries_status_message_and_details() {
        let body = serde_json::to_value(ApiError::bad_request("Subject is required")).unwrap();
        assert_eq!(body, json!({"statusCode": 400, "message": "Subject is required"}));

        let body = serde_json::to_value(ApiError::invalid_field("priority", "unknown value 'Urgent'")).unwrap();
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["details"]["priority"], "unknown value 'Urgent'");
    }

    #[test]
    fn internal_details_are_not_returned() {
        let err = DatabaseError::Corrupt("request SOL-2026-0001: invalid status: 'Open'".into());
        let api = ApiError::from(ServiceError::from(err));
        assert_eq!(api.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("SOL-2026-0001"));

        let pool = ApiError::from(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(pool.status_code, StatusCode::SERVICE_UNAVAILABLE);
    }
}
