use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::database::models::{Comment, HistoryEntry, NewComment, Request};
use crate::database::store::Store;
use crate::services::access::{ensure_access, Scope};
use crate::services::views::{CommentView, ViewResolver};
use crate::services::{Principal, ServiceError, ServiceResult};

pub const COMMENT_MAX_CHARS: usize = 1000;

/// Comment timeline and status history of a request
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load_journal(&self, request_id: i32, principal: &Principal) -> ServiceResult<Request> {
        let request = self
            .store
            .find_request(request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Request {} not found", request_id)))?;
        ensure_access(&request, principal, Scope::Journal)?;
        Ok(request)
    }

    pub async fn add_comment(
        &self,
        request_id: i32,
        text: &str,
        principal: &Principal,
    ) -> ServiceResult<Comment> {
        let request = self.load_journal(request_id, principal).await?;
        if request.status.is_dead() {
            return Err(ServiceError::business(format!(
                "Cannot comment on a request that is {}",
                request.status
            )));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::business("Comment text is required"));
        }
        if text.chars().count() > COMMENT_MAX_CHARS {
            return Err(ServiceError::business(format!(
                "Comments must be at most {} characters",
                COMMENT_MAX_CHARS
            )));
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                request_id: request.id,
                author_id: principal.user_id,
                text: text.to_string(),
                is_system: false,
                event_kind: None,
                created_at: Utc::now(),
            })
            .await?;

        info!("User {} commented on request {}", principal.user_id, request.number);
        Ok(comment)
    }

    pub async fn list_comments(&self, request_id: i32, principal: &Principal) -> ServiceResult<Vec<Comment>> {
        let request = self.load_journal(request_id, principal).await?;
        Ok(self.store.list_comments(request.id).await?)
    }

    pub async fn present(&self, comment: Comment) -> ServiceResult<CommentView> {
        ViewResolver::new(self.store.as_ref()).comment(comment).await
    }

    pub async fn present_all(&self, comments: Vec<Comment>) -> ServiceResult<Vec<CommentView>> {
        ViewResolver::new(self.store.as_ref()).comments(comments).await
    }

    pub async fn list_history(
        &self,
        request_id: i32,
        principal: &Principal,
    ) -> ServiceResult<Vec<HistoryEntry>> {
        let request = self.load_journal(request_id, principal).await?;
        Ok(self.store.list_history(request.id).await?)
    }
}
