use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::manager::DatabaseError;
use crate::types::{Priority, RequestStatus};

/// Blob reference kept on the request row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    #[serde(skip_serializing)]
    pub path: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: i32,
    pub number: String,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub area_id: Option<i32>,
    pub type_id: i32,
    pub requester_id: i32,
    pub assigned_agent_id: Option<i32>,
    pub rejection_reason: Option<String>,
    pub attachment: Option<Attachment>,
    /// Optimistic concurrency token, bumped by every committed transition
    #[serde(skip_serializing)]
    pub version: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct RequestRow {
    pub id: i32,
    pub number: String,
    pub subject: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub area_id: Option<i32>,
    pub type_id: i32,
    pub requester_id: i32,
    pub assigned_agent_id: Option<i32>,
    pub rejection_reason: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_path: Option<String>,
    pub attachment_content_type: Option<String>,
    pub version: i32,
}

impl TryFrom<RequestRow> for Request {
    type Error = DatabaseError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::types::ParseEnumError| {
            DatabaseError::Corrupt(format!("request {}: {}", row.number, e))
        };
        let priority = row.priority.parse().map_err(corrupt)?;
        let status = row.status.parse().map_err(corrupt)?;

        let attachment = match (row.attachment_name, row.attachment_path) {
            (Some(file_name), Some(path)) => Some(Attachment {
                file_name,
                path,
                content_type: row.attachment_content_type,
            }),
            _ => None,
        };

        Ok(Request {
            id: row.id,
            number: row.number,
            subject: row.subject,
            description: row.description,
            priority,
            status,
            created_at: row.created_at,
            closed_at: row.closed_at,
            area_id: row.area_id,
            type_id: row.type_id,
            requester_id: row.requester_id,
            assigned_agent_id: row.assigned_agent_id,
            rejection_reason: row.rejection_reason,
            attachment,
            version: row.version,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub number: String,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub area_id: Option<i32>,
    pub type_id: i32,
    pub requester_id: i32,
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
}

/// Filters accepted by request listings; `None` means "any"
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub requester_id: Option<i32>,
    pub area_id: Option<i32>,
    pub assigned_agent_id: Option<i32>,
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
    pub unassigned_only: bool,
    /// Requests whose type has no area ("Other")
    pub without_area: bool,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        self.requester_id.map_or(true, |id| request.requester_id == id)
            && self.area_id.map_or(true, |id| request.area_id == Some(id))
            && self
                .assigned_agent_id
                .map_or(true, |id| request.assigned_agent_id == Some(id))
            && self.status.map_or(true, |s| request.status == s)
            && self.priority.map_or(true, |p| request.priority == p)
            && (!self.unassigned_only || request.assigned_agent_id.is_none())
            && (!self.without_area || request.area_id.is_none())
    }
}
