pub mod access;
pub mod auth_service;
pub mod catalog_service;
pub mod comment_service;
pub mod export_service;
pub mod lifecycle;
pub mod numbering;
pub mod report_service;
pub mod request_service;
pub mod user_service;
pub mod views;

use std::future::Future;
use thiserror::Error;

use crate::auth::PasswordError;
use crate::blob::BlobError;
use crate::database::manager::DatabaseError;
use crate::database::models::User;
use crate::render::RenderError;
use crate::types::Role;

pub use auth_service::{AuthService, LoginResponse};
pub use catalog_service::{AreaSummary, AreaUpdate, CatalogService, PriorityInfo, RequestTypeUpdate};
pub use comment_service::CommentService;
pub use export_service::{ExportService, ExportedFile};
pub use report_service::{ReportBundle, ReportService};
pub use request_service::{AttachmentChange, EditInput, NewRequestInput, RequestService, Upload};
pub use user_service::{CreateUserInput, UpdateUserInput, UserService};
pub use views::{CommentView, RequestView, ViewResolver};

/// Domain failures surfaced to the HTTP layer
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    /// A business rule refused the operation
    #[error("{0}")]
    Business(String),

    /// The caller is authenticated but not allowed to do this
    #[error("{0}")]
    UnauthorizedAction(String),

    #[error("{0}")]
    Unauthenticated(String),

    /// Optimistic concurrency token mismatch; retried by the services
    #[error("Concurrent modification of {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(DatabaseError),

    #[error(transparent)]
    Blob(BlobError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn business(message: impl Into<String>) -> Self {
        ServiceError::Business(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::UnauthorizedAction(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ServiceError::Unauthenticated(message.into())
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ServiceError::NotFound(msg),
            DatabaseError::Conflict(what) => ServiceError::Conflict(what),
            other => ServiceError::Database(other),
        }
    }
}

impl From<BlobError> for ServiceError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(path) => {
                ServiceError::NotFound(format!("Attachment {} not found", path))
            }
            other => ServiceError::Blob(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Authenticated caller, rebuilt from the stored user on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub role: Role,
    pub area_id: Option<i32>,
    pub display_name: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> ServiceResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("Administrator role required"))
        }
    }

    pub fn require_super_admin(&self) -> ServiceResult<()> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(ServiceError::forbidden("SuperAdministrador role required"))
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            area_id: user.area_id,
            display_name: user.display_name.clone(),
        }
    }
}

/// Read-validate-write cycles a request transition may take before giving up
pub const MAX_REVALIDATIONS: usize = 3;

/// Re-runs `attempt` while it fails with [`ServiceError::Conflict`].
///
/// Every attempt re-reads and re-validates, so the loser of a race sees the
/// rule the winner's write made true.
pub async fn retry_on_conflict<T, F, Fut>(mut attempt: F) -> ServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    for round in 1..=MAX_REVALIDATIONS {
        match attempt().await {
            Err(ServiceError::Conflict(what)) => {
                tracing::warn!("Version conflict on {} (attempt {}/{})", what, round, MAX_REVALIDATIONS);
            }
            other => return other,
        }
    }
    Err(ServiceError::business(
        "The request was modified concurrently, please retry",
    ))
}
