use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::*;
use crate::database::store::{RequestChange, Store};
use crate::types::{RequestStatus, Role};

const USER_COLUMNS: &str =
    "id, username, display_name, email, password_hash, role, area_id, active, created_at";

const REQUEST_COLUMNS: &str = "id, number, subject, description, priority, status, created_at, \
     closed_at, area_id, type_id, requester_id, assigned_agent_id, rejection_reason, \
     attachment_name, attachment_path, attachment_content_type, version";

const COMMENT_COLUMNS: &str = "id, request_id, author_id, text, created_at, is_system, event_kind";

const HISTORY_COLUMNS: &str =
    "id, request_id, actor_id, status_before, status_after, note, changed_at";

/// [`Store`] over a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_models<R, M>(rows: Vec<R>) -> Result<Vec<M>, DatabaseError>
where
    M: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(M::try_from).collect()
}

async fn insert_comment_row<'e, E: PgExecutor<'e>>(
    executor: E,
    comment: &NewComment,
) -> Result<CommentRow, DatabaseError> {
    let query = format!(
        "INSERT INTO comments (request_id, author_id, text, created_at, is_system, event_kind) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        COMMENT_COLUMNS
    );
    let row = sqlx::query_as::<_, CommentRow>(&query)
        .bind(comment.request_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .bind(comment.is_system)
        .bind(comment.event_kind.map(|k| k.as_str()))
        .fetch_one(executor)
        .await?;
    Ok(row)
}

async fn insert_history_row<'e, E: PgExecutor<'e>>(
    executor: E,
    entry: &NewHistoryEntry,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO request_history (request_id, actor_id, status_before, status_after, note, changed_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.request_id)
    .bind(entry.actor_id)
    .bind(entry.status_before.as_str())
    .bind(entry.status_after.as_str())
    .bind(&entry.note)
    .bind(entry.changed_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM users WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY display_name, id",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(role.map(|r| r.as_str()))
            .fetch_all(&self.pool)
            .await?;
        into_models(rows)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let query = format!(
            "INSERT INTO users (username, display_name, email, password_hash, role, area_id, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(&user.username)
            .bind(&user.display_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.area_id)
            .bind(user.active)
            .fetch_one(&self.pool)
            .await?;
        User::try_from(row)
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, display_name = $3, email = $4, password_hash = $5, \
             role = $6, area_id = $7, active = $8 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.area_id)
        .bind(user.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {} not found", user.id)));
        }
        Ok(())
    }

    async fn email_taken(&self, email: &str, except_id: Option<i32>) -> Result<bool, DatabaseError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) \
             AND ($2::INTEGER IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn delete_user_detaching(&self, id: i32) -> Result<UserDeletion, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query(
            "UPDATE requests SET assigned_agent_id = NULL, version = version + 1 \
             WHERE assigned_agent_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let comments = sqlx::query("DELETE FROM comments WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let history = sqlx::query("DELETE FROM request_history WHERE actor_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let user = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if user.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {} not found", id)));
        }

        tx.commit().await?;
        Ok(UserDeletion {
            detached_requests: detached.rows_affected(),
            deleted_comments: comments.rows_affected(),
            deleted_history: history.rows_affected(),
        })
    }

    async fn find_area(&self, id: i32) -> Result<Option<Area>, DatabaseError> {
        let area = sqlx::query_as::<_, Area>(
            "SELECT id, name, description, active FROM areas WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(area)
    }

    async fn list_areas(&self) -> Result<Vec<Area>, DatabaseError> {
        let areas = sqlx::query_as::<_, Area>(
            "SELECT id, name, description, active FROM areas ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(areas)
    }

    async fn insert_area(&self, area: NewArea) -> Result<Area, DatabaseError> {
        let row = sqlx::query_as::<_, Area>(
            "INSERT INTO areas (name, description) VALUES ($1, $2) \
             RETURNING id, name, description, active",
        )
        .bind(&area.name)
        .bind(&area.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_area(&self, area: &Area) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE areas SET name = $2, description = $3, active = $4 WHERE id = $1",
        )
        .bind(area.id)
        .bind(&area.name)
        .bind(&area.description)
        .bind(area.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("area {} not found", area.id)));
        }
        Ok(())
    }

    async fn delete_area(&self, id: i32) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM areas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("area {} not found", id)));
        }
        Ok(())
    }

    async fn set_area_active(&self, id: i32, active: bool) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let area = sqlx::query("UPDATE areas SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&mut *tx)
            .await?;
        if area.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("area {} not found", id)));
        }

        let agents = sqlx::query("UPDATE users SET active = $2 WHERE area_id = $1 AND role = $3")
            .bind(id)
            .bind(active)
            .bind(Role::AreaAgent.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(agents.rows_affected())
    }

    async fn find_request_type(&self, id: i32) -> Result<Option<RequestType>, DatabaseError> {
        let row = sqlx::query_as::<_, RequestType>(
            "SELECT id, name, description, area_id, active FROM request_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_request_types(&self, area_id: Option<i32>) -> Result<Vec<RequestType>, DatabaseError> {
        let rows = sqlx::query_as::<_, RequestType>(
            "SELECT id, name, description, area_id, active FROM request_types \
             WHERE ($1::INTEGER IS NULL OR area_id = $1) ORDER BY name, id",
        )
        .bind(area_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_request_type(&self, request_type: NewRequestType) -> Result<RequestType, DatabaseError> {
        let row = sqlx::query_as::<_, RequestType>(
            "INSERT INTO request_types (name, description, area_id) VALUES ($1, $2, $3) \
             RETURNING id, name, description, area_id, active",
        )
        .bind(&request_type.name)
        .bind(&request_type.description)
        .bind(request_type.area_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_request_type(&self, request_type: &RequestType) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE request_types SET name = $2, description = $3, area_id = $4, active = $5 \
             WHERE id = $1",
        )
        .bind(request_type.id)
        .bind(&request_type.name)
        .bind(&request_type.description)
        .bind(request_type.area_id)
        .bind(request_type.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "request type {} not found",
                request_type.id
            )));
        }
        Ok(())
    }

    async fn delete_request_type(&self, id: i32) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM request_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("request type {} not found", id)));
        }
        Ok(())
    }

    async fn find_request(&self, id: i32) -> Result<Option<Request>, DatabaseError> {
        let query = format!("SELECT {} FROM requests WHERE id = $1", REQUEST_COLUMNS);
        sqlx::query_as::<_, RequestRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Request::try_from)
            .transpose()
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM requests \
             WHERE ($1::INTEGER IS NULL OR requester_id = $1) \
               AND ($2::INTEGER IS NULL OR area_id = $2) \
               AND ($3::INTEGER IS NULL OR assigned_agent_id = $3) \
               AND ($4::TEXT IS NULL OR status = $4) \
               AND ($5::TEXT IS NULL OR priority = $5) \
               AND (NOT $6 OR assigned_agent_id IS NULL) \
               AND (NOT $7 OR area_id IS NULL) \
             ORDER BY created_at DESC, id DESC",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, RequestRow>(&query)
            .bind(filter.requester_id)
            .bind(filter.area_id)
            .bind(filter.assigned_agent_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .bind(filter.unassigned_only)
            .bind(filter.without_area)
            .fetch_all(&self.pool)
            .await?;
        into_models(rows)
    }

    async fn max_sequence(&self, prefix: &str) -> Result<Option<u32>, DatabaseError> {
        let start = i32::try_from(prefix.chars().count() + 1)
            .map_err(|_| DatabaseError::Corrupt(format!("number prefix too long: {}", prefix)))?;

        let max = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(CAST(SUBSTRING(number FROM $2) AS BIGINT)) FROM requests \
             WHERE LEFT(number, $2 - 1) = $1 AND SUBSTRING(number FROM $2) ~ '^[0-9]+$'",
        )
        .bind(prefix)
        .bind(start)
        .fetch_one(&self.pool)
        .await?;

        max.map(|seq| {
            u32::try_from(seq)
                .map_err(|_| DatabaseError::Corrupt(format!("sequence out of range: {}", seq)))
        })
        .transpose()
    }

    async fn insert_request(
        &self,
        request: NewRequest,
        opening: Option<NewComment>,
    ) -> Result<Request, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO requests (number, subject, description, priority, status, created_at, \
             area_id, type_id, requester_id, attachment_name, attachment_path, attachment_content_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
            REQUEST_COLUMNS
        );
        let attachment = request.attachment.as_ref();
        let row = sqlx::query_as::<_, RequestRow>(&query)
            .bind(&request.number)
            .bind(&request.subject)
            .bind(&request.description)
            .bind(request.priority.as_str())
            .bind(RequestStatus::New.as_str())
            .bind(request.created_at)
            .bind(request.area_id)
            .bind(request.type_id)
            .bind(request.requester_id)
            .bind(attachment.map(|a| a.file_name.as_str()))
            .bind(attachment.map(|a| a.path.as_str()))
            .bind(attachment.and_then(|a| a.content_type.as_deref()))
            .fetch_one(&mut *tx)
            .await?;

        if let Some(comment) = opening {
            let comment = NewComment {
                request_id: row.id,
                ..comment
            };
            insert_comment_row(&mut *tx, &comment).await?;
        }

        tx.commit().await?;
        Request::try_from(row)
    }

    async fn apply_change(&self, change: RequestChange) -> Result<Request, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let request = &change.request;
        let attachment = request.attachment.as_ref();

        let query = format!(
            "UPDATE requests SET subject = $3, description = $4, priority = $5, status = $6, \
             closed_at = $7, assigned_agent_id = $8, rejection_reason = $9, attachment_name = $10, \
             attachment_path = $11, attachment_content_type = $12, version = version + 1 \
             WHERE id = $1 AND version = $2 RETURNING {}",
            REQUEST_COLUMNS
        );
        let row = sqlx::query_as::<_, RequestRow>(&query)
            .bind(request.id)
            .bind(change.expected_version)
            .bind(&request.subject)
            .bind(&request.description)
            .bind(request.priority.as_str())
            .bind(request.status.as_str())
            .bind(request.closed_at)
            .bind(request.assigned_agent_id)
            .bind(&request.rejection_reason)
            .bind(attachment.map(|a| a.file_name.as_str()))
            .bind(attachment.map(|a| a.path.as_str()))
            .bind(attachment.and_then(|a| a.content_type.as_deref()))
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM requests WHERE id = $1)")
                .bind(request.id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                DatabaseError::Conflict(format!("request {}", request.number))
            } else {
                DatabaseError::NotFound(format!("request {} not found", request.id))
            });
        };

        for entry in &change.history {
            insert_history_row(&mut *tx, entry).await?;
        }
        for comment in &change.comments {
            insert_comment_row(&mut *tx, comment).await?;
        }

        tx.commit().await?;
        Request::try_from(row)
    }

    async fn count_requests_by_area(&self, area_id: i32) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requests WHERE area_id = $1")
            .bind(area_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn count_open_requests_by_area(&self, area_id: i32) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM requests WHERE area_id = $1 AND status IN ($2, $3)",
        )
        .bind(area_id)
        .bind(RequestStatus::New.as_str())
        .bind(RequestStatus::InProgress.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn count_requests_by_type(&self, type_id: i32) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requests WHERE type_id = $1")
            .bind(type_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn count_requests_by_requester(&self, user_id: i32) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requests WHERE requester_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn count_users_by_area(&self, area_id: i32) -> Result<i64, DatabaseError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE area_id = $1")
            .bind(area_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, DatabaseError> {
        let row = insert_comment_row(&self.pool, &comment).await?;
        Comment::try_from(row)
    }

    async fn list_comments(&self, request_id: i32) -> Result<Vec<Comment>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM comments WHERE request_id = $1 ORDER BY created_at, id",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, CommentRow>(&query)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;
        into_models(rows)
    }

    async fn list_history(&self, request_id: i32) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM request_history WHERE request_id = $1 ORDER BY changed_at, id",
            HISTORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, HistoryRow>(&query)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;
        into_models(rows)
    }
}
