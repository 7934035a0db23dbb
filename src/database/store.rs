use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::*;
use crate::types::Role;

/// A committed lifecycle step: the new request state plus the audit rows
/// written with it. Applied atomically, and only if the stored row still
/// carries `expected_version`.
#[derive(Debug, Clone)]
pub struct RequestChange {
    pub request: Request,
    pub expected_version: i32,
    pub history: Vec<NewHistoryEntry>,
    pub comments: Vec<NewComment>,
}

/// Relational store consumed by the services.
///
/// Implementations must enforce the unique constraints named in
/// [`crate::database::manager::constraints`] and report violations as
/// [`DatabaseError::UniqueViolation`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Users
    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, DatabaseError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn update_user(&self, user: &User) -> Result<(), DatabaseError>;
    async fn email_taken(&self, email: &str, except_id: Option<i32>) -> Result<bool, DatabaseError>;

    /// Force-delete cascade, one transaction: detach the user's assigned
    /// requests, delete the comments and history rows they authored, then
    /// delete the user.
    async fn delete_user_detaching(&self, id: i32) -> Result<UserDeletion, DatabaseError>;

    // Areas
    async fn find_area(&self, id: i32) -> Result<Option<Area>, DatabaseError>;
    async fn list_areas(&self) -> Result<Vec<Area>, DatabaseError>;
    async fn insert_area(&self, area: NewArea) -> Result<Area, DatabaseError>;
    async fn update_area(&self, area: &Area) -> Result<(), DatabaseError>;
    async fn delete_area(&self, id: i32) -> Result<(), DatabaseError>;

    /// Deactivation cascade, one transaction: flips the area and every
    /// AgenteArea user of that area. Returns the number of agents changed.
    async fn set_area_active(&self, id: i32, active: bool) -> Result<u64, DatabaseError>;

    // Request types
    async fn find_request_type(&self, id: i32) -> Result<Option<RequestType>, DatabaseError>;
    async fn list_request_types(&self, area_id: Option<i32>) -> Result<Vec<RequestType>, DatabaseError>;
    async fn insert_request_type(&self, request_type: NewRequestType) -> Result<RequestType, DatabaseError>;
    async fn update_request_type(&self, request_type: &RequestType) -> Result<(), DatabaseError>;
    async fn delete_request_type(&self, id: i32) -> Result<(), DatabaseError>;

    // Requests
    async fn find_request(&self, id: i32) -> Result<Option<Request>, DatabaseError>;

    /// Newest first
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, DatabaseError>;

    /// Highest numeric suffix among numbers starting with `prefix`
    async fn max_sequence(&self, prefix: &str) -> Result<Option<u32>, DatabaseError>;

    /// Inserts the request and its opening comment in one transaction
    async fn insert_request(
        &self,
        request: NewRequest,
        opening: Option<NewComment>,
    ) -> Result<Request, DatabaseError>;

    /// Returns [`DatabaseError::Conflict`] when the stored version moved on
    async fn apply_change(&self, change: RequestChange) -> Result<Request, DatabaseError>;

    async fn count_requests_by_area(&self, area_id: i32) -> Result<i64, DatabaseError>;
    async fn count_open_requests_by_area(&self, area_id: i32) -> Result<i64, DatabaseError>;
    async fn count_requests_by_type(&self, type_id: i32) -> Result<i64, DatabaseError>;
    async fn count_requests_by_requester(&self, user_id: i32) -> Result<i64, DatabaseError>;
    async fn count_users_by_area(&self, area_id: i32) -> Result<i64, DatabaseError>;

    // Comments and history
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, DatabaseError>;

    /// Oldest first
    async fn list_comments(&self, request_id: i32) -> Result<Vec<Comment>, DatabaseError>;

    /// Oldest first
    async fn list_history(&self, request_id: i32) -> Result<Vec<HistoryEntry>, DatabaseError>;
}
