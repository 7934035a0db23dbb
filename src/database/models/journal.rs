use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::manager::DatabaseError;
use crate::types::{EventKind, RequestStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i32,
    pub request_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub is_system: bool,
    pub event_kind: Option<EventKind>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i32,
    pub request_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub is_system: bool,
    pub event_kind: Option<String>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = DatabaseError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let event_kind = row
            .event_kind
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| DatabaseError::Corrupt(format!("comment {}: {}", row.id, e)))?;

        Ok(Comment {
            id: row.id,
            request_id: row.request_id,
            author_id: row.author_id,
            text: row.text,
            created_at: row.created_at,
            is_system: row.is_system,
            event_kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub request_id: i32,
    pub author_id: i32,
    pub text: String,
    pub is_system: bool,
    pub event_kind: Option<EventKind>,
    pub created_at: DateTime<Utc>,
}

impl NewComment {
    /// Timeline entry written by the workflow on behalf of `author_id`
    pub fn system(
        request_id: i32,
        author_id: i32,
        kind: EventKind,
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            author_id,
            text: text.into(),
            is_system: true,
            event_kind: Some(kind),
            created_at: at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i32,
    pub request_id: i32,
    pub actor_id: i32,
    pub status_before: RequestStatus,
    pub status_after: RequestStatus,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: i32,
    pub request_id: i32,
    pub actor_id: i32,
    pub status_before: String,
    pub status_after: String,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = DatabaseError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::types::ParseEnumError| {
            DatabaseError::Corrupt(format!("history {}: {}", row.id, e))
        };

        Ok(HistoryEntry {
            id: row.id,
            request_id: row.request_id,
            actor_id: row.actor_id,
            status_before: row.status_before.parse().map_err(corrupt)?,
            status_after: row.status_after.parse().map_err(corrupt)?,
            note: row.note,
            changed_at: row.changed_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub request_id: i32,
    pub actor_id: i32,
    pub status_before: RequestStatus,
    pub status_after: RequestStatus,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}
