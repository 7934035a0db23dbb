use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use crate::database::manager::{constraints, DatabaseError};
use crate::database::models::*;
use crate::database::store::{RequestChange, Store};
use crate::types::{RequestStatus, Role};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    areas: Vec<Area>,
    request_types: Vec<RequestType>,
    requests: Vec<Request>,
    comments: Vec<Comment>,
    history: Vec<HistoryEntry>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn push_comment(&mut self, comment: NewComment) -> Comment {
        let row = Comment {
            id: self.next_id(),
            request_id: comment.request_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: comment.created_at,
            is_system: comment.is_system,
            event_kind: comment.event_kind,
        };
        self.comments.push(row.clone());
        row
    }

    fn push_history(&mut self, entry: NewHistoryEntry) -> HistoryEntry {
        let row = HistoryEntry {
            id: self.next_id(),
            request_id: entry.request_id,
            actor_id: entry.actor_id,
            status_before: entry.status_before,
            status_after: entry.status_after,
            note: entry.note,
            changed_at: entry.changed_at,
        };
        self.history.push(row.clone());
        row
    }

    fn check_user_unique(&self, username: &str, email: &str, except: Option<i32>) -> Result<(), DatabaseError> {
        let others = self.users.iter().filter(|u| Some(u.id) != except);
        for user in others {
            if user.username == username {
                return Err(DatabaseError::UniqueViolation(constraints::USER_USERNAME.to_string()));
            }
            if user.email == email {
                return Err(DatabaseError::UniqueViolation(constraints::USER_EMAIL.to_string()));
            }
        }
        Ok(())
    }

    fn check_area_unique(&self, name: &str, except: Option<i32>) -> Result<(), DatabaseError> {
        if self
            .areas
            .iter()
            .any(|a| Some(a.id) != except && a.name == name)
        {
            return Err(DatabaseError::UniqueViolation(constraints::AREA_NAME.to_string()));
        }
        Ok(())
    }

    fn check_type_unique(
        &self,
        name: &str,
        area_id: Option<i32>,
        except: Option<i32>,
    ) -> Result<(), DatabaseError> {
        if self
            .request_types
            .iter()
            .any(|t| Some(t.id) != except && t.area_id == area_id && t.name == name)
        {
            return Err(DatabaseError::UniqueViolation(
                constraints::REQUEST_TYPE_NAME.to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-local store with the same constraints as the PostgreSQL schema.
///
/// Backs the unit tests and `serve --store memory`. Every method holds the
/// lock for its whole body, which gives each call the atomicity of a
/// transaction.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found(what: &str, id: i32) -> DatabaseError {
    DatabaseError::NotFound(format!("{} {} not found", what, id))
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, DatabaseError> {
        let mut users: Vec<User> = self
            .tables()
            .users
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables();
        tables.check_user_unique(&user.username, &user.email, None)?;

        let row = User {
            id: tables.next_id(),
            username: user.username,
            display_name: user.display_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            area_id: user.area_id,
            active: user.active,
            created_at: chrono::Utc::now(),
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables();
        tables.check_user_unique(&user.username, &user.email, Some(user.id))?;

        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| not_found("user", user.id))?;
        *slot = user.clone();
        Ok(())
    }

    async fn email_taken(&self, email: &str, except_id: Option<i32>) -> Result<bool, DatabaseError> {
        Ok(self
            .tables()
            .users
            .iter()
            .any(|u| Some(u.id) != except_id && u.email.eq_ignore_ascii_case(email)))
    }

    async fn delete_user_detaching(&self, id: i32) -> Result<UserDeletion, DatabaseError> {
        let mut tables = self.tables();
        if !tables.users.iter().any(|u| u.id == id) {
            return Err(not_found("user", id));
        }

        let mut deletion = UserDeletion::default();
        for request in tables
            .requests
            .iter_mut()
            .filter(|r| r.assigned_agent_id == Some(id))
        {
            request.assigned_agent_id = None;
            request.version += 1;
            deletion.detached_requests += 1;
        }

        let before = tables.comments.len();
        tables.comments.retain(|c| c.author_id != id);
        deletion.deleted_comments = (before - tables.comments.len()) as u64;

        let before = tables.history.len();
        tables.history.retain(|h| h.actor_id != id);
        deletion.deleted_history = (before - tables.history.len()) as u64;

        tables.users.retain(|u| u.id != id);
        Ok(deletion)
    }

    async fn find_area(&self, id: i32) -> Result<Option<Area>, DatabaseError> {
        Ok(self.tables().areas.iter().find(|a| a.id == id).cloned())
    }

    async fn list_areas(&self) -> Result<Vec<Area>, DatabaseError> {
        let mut areas = self.tables().areas.clone();
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(areas)
    }

    async fn insert_area(&self, area: NewArea) -> Result<Area, DatabaseError> {
        let mut tables = self.tables();
        tables.check_area_unique(&area.name, None)?;

        let row = Area {
            id: tables.next_id(),
            name: area.name,
            description: area.description,
            active: true,
        };
        tables.areas.push(row.clone());
        Ok(row)
    }

    async fn update_area(&self, area: &Area) -> Result<(), DatabaseError> {
        let mut tables = self.tables();
        tables.check_area_unique(&area.name, Some(area.id))?;

        let slot = tables
            .areas
            .iter_mut()
            .find(|a| a.id == area.id)
            .ok_or_else(|| not_found("area", area.id))?;
        *slot = area.clone();
        Ok(())
    }

    async fn delete_area(&self, id: i32) -> Result<(), DatabaseError> {
        let mut tables = self.tables();
        let before = tables.areas.len();
        tables.areas.retain(|a| a.id != id);
        if tables.areas.len() == before {
            return Err(not_found("area", id));
        }
        Ok(())
    }

    async fn set_area_active(&self, id: i32, active: bool) -> Result<u64, DatabaseError> {
        let mut tables = self.tables();
        let area = tables
            .areas
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found("area", id))?;
        area.active = active;

        let mut agents = 0;
        for user in tables
            .users
            .iter_mut()
            .filter(|u| u.role == Role::AreaAgent && u.area_id == Some(id))
        {
            user.active = active;
            agents += 1;
        }
        Ok(agents)
    }

    async fn find_request_type(&self, id: i32) -> Result<Option<RequestType>, DatabaseError> {
        Ok(self
            .tables()
            .request_types
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn list_request_types(&self, area_id: Option<i32>) -> Result<Vec<RequestType>, DatabaseError> {
        let mut types: Vec<RequestType> = self
            .tables()
            .request_types
            .iter()
            .filter(|t| area_id.map_or(true, |id| t.area_id == Some(id)))
            .cloned()
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(types)
    }

    async fn insert_request_type(&self, request_type: NewRequestType) -> Result<RequestType, DatabaseError> {
        let mut tables = self.tables();
        tables.check_type_unique(&request_type.name, request_type.area_id, None)?;

        let row = RequestType {
            id: tables.next_id(),
            name: request_type.name,
            description: request_type.description,
            area_id: request_type.area_id,
            active: true,
        };
        tables.request_types.push(row.clone());
        Ok(row)
    }

    async fn update_request_type(&self, request_type: &RequestType) -> Result<(), DatabaseError> {
        let mut tables = self.tables();
        tables.check_type_unique(&request_type.name, request_type.area_id, Some(request_type.id))?;

        let slot = tables
            .request_types
            .iter_mut()
            .find(|t| t.id == request_type.id)
            .ok_or_else(|| not_found("request type", request_type.id))?;
        *slot = request_type.clone();
        Ok(())
    }

    async fn delete_request_type(&self, id: i32) -> Result<(), DatabaseError> {
        let mut tables = self.tables();
        let before = tables.request_types.len();
        tables.request_types.retain(|t| t.id != id);
        if tables.request_types.len() == before {
            return Err(not_found("request type", id));
        }
        Ok(())
    }

    async fn find_request(&self, id: i32) -> Result<Option<Request>, DatabaseError> {
        Ok(self.tables().requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, DatabaseError> {
        let mut requests: Vec<Request> = self
            .tables()
            .requests
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn max_sequence(&self, prefix: &str) -> Result<Option<u32>, DatabaseError> {
        Ok(self
            .tables()
            .requests
            .iter()
            .filter_map(|r| r.number.strip_prefix(prefix))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max())
    }

    async fn insert_request(
        &self,
        request: NewRequest,
        opening: Option<NewComment>,
    ) -> Result<Request, DatabaseError> {
        let mut tables = self.tables();
        if tables.requests.iter().any(|r| r.number == request.number) {
            return Err(DatabaseError::UniqueViolation(
                constraints::REQUEST_NUMBER.to_string(),
            ));
        }

        let row = Request {
            id: tables.next_id(),
            number: request.number,
            subject: request.subject,
            description: request.description,
            priority: request.priority,
            status: RequestStatus::New,
            created_at: request.created_at,
            closed_at: None,
            area_id: request.area_id,
            type_id: request.type_id,
            requester_id: request.requester_id,
            assigned_agent_id: None,
            rejection_reason: None,
            attachment: request.attachment,
            version: 0,
        };
        tables.requests.push(row.clone());

        if let Some(comment) = opening {
            tables.push_comment(NewComment {
                request_id: row.id,
                ..comment
            });
        }
        Ok(row)
    }

    async fn apply_change(&self, change: RequestChange) -> Result<Request, DatabaseError> {
        let mut tables = self.tables();
        let id = change.request.id;
        let slot = tables
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("request", id))?;

        if slot.version != change.expected_version {
            return Err(DatabaseError::Conflict(format!("request {}", slot.number)));
        }

        let mut updated = change.request;
        updated.number = slot.number.clone();
        updated.version = change.expected_version + 1;
        *slot = updated.clone();

        for entry in change.history {
            tables.push_history(entry);
        }
        for comment in change.comments {
            tables.push_comment(comment);
        }
        Ok(updated)
    }

    async fn count_requests_by_area(&self, area_id: i32) -> Result<i64, DatabaseError> {
        Ok(count(
            self.tables()
                .requests
                .iter()
                .filter(|r| r.area_id == Some(area_id))
                .count(),
        ))
    }

    async fn count_open_requests_by_area(&self, area_id: i32) -> Result<i64, DatabaseError> {
        Ok(count(
            self.tables()
                .requests
                .iter()
                .filter(|r| r.area_id == Some(area_id) && r.status.is_open())
                .count(),
        ))
    }

    async fn count_requests_by_type(&self, type_id: i32) -> Result<i64, DatabaseError> {
        Ok(count(
            self.tables()
                .requests
                .iter()
                .filter(|r| r.type_id == type_id)
                .count(),
        ))
    }

    async fn count_requests_by_requester(&self, user_id: i32) -> Result<i64, DatabaseError> {
        Ok(count(
            self.tables()
                .requests
                .iter()
                .filter(|r| r.requester_id == user_id)
                .count(),
        ))
    }

    async fn count_users_by_area(&self, area_id: i32) -> Result<i64, DatabaseError> {
        Ok(count(
            self.tables()
                .users
                .iter()
                .filter(|u| u.area_id == Some(area_id))
                .count(),
        ))
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, DatabaseError> {
        let mut tables = self.tables();
        if !tables.requests.iter().any(|r| r.id == comment.request_id) {
            return Err(not_found("request", comment.request_id));
        }
        Ok(tables.push_comment(comment))
    }

    async fn list_comments(&self, request_id: i32) -> Result<Vec<Comment>, DatabaseError> {
        let mut comments: Vec<Comment> = self
            .tables()
            .comments
            .iter()
            .filter(|c| c.request_id == request_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn list_history(&self, request_id: i32) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let mut history: Vec<HistoryEntry> = self
            .tables()
            .history
            .iter()
            .filter(|h| h.request_id == request_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use chrono::Utc;

    fn new_request(number: &str) -> NewRequest {
        NewRequest {
            number: number.to_string(),
            subject: "Printer".to_string(),
            description: "Out of toner".to_string(),
            priority: Priority::Medium,
            area_id: Some(1),
            type_id: 1,
            requester_id: 5,
            attachment: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_number_is_a_unique_violation() {
        let store = MemoryStore::new();
        store.insert_request(new_request("SOL-2026-0001"), None).await.unwrap();

        let err = store
            .insert_request(new_request("SOL-2026-0001"), None)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation(constraints::REQUEST_NUMBER));
    }

    #[tokio::test]
    async fn max_sequence_is_numeric_and_scoped_to_prefix() {
        let store = MemoryStore::new();
        for number in ["SOL-2026-0009", "SOL-2026-10000", "SOL-2025-0042"] {
            store.insert_request(new_request(number), None).await.unwrap();
        }

        assert_eq!(store.max_sequence("SOL-2026-").await.unwrap(), Some(10000));
        assert_eq!(store.max_sequence("SOL-2025-").await.unwrap(), Some(42));
        assert_eq!(store.max_sequence("SOL-2024-").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let request = store.insert_request(new_request("SOL-2026-0001"), None).await.unwrap();

        let mut next = request.clone();
        next.status = RequestStatus::InProgress;
        let change = RequestChange {
            request: next,
            expected_version: request.version,
            history: vec![],
            comments: vec![],
        };
        let applied = store.apply_change(change.clone()).await.unwrap();
        assert_eq!(applied.version, request.version + 1);

        let err = store.apply_change(change).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn opening_comment_is_attached_to_the_new_request() {
        let store = MemoryStore::new();
        let opening = NewComment::system(0, 5, crate::types::EventKind::Created, "Request created", Utc::now());
        let request = store
            .insert_request(new_request("SOL-2026-0001"), Some(opening))
            .await
            .unwrap();

        let comments = store.list_comments(request.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].request_id, request.id);
        assert!(comments[0].is_system);
    }

    #[tokio::test]
    async fn area_deactivation_reaches_its_agents_only() {
        let store = MemoryStore::new();
        let area = store
            .insert_area(NewArea { name: "IT".into(), description: None })
            .await
            .unwrap();
        let agent = |username: &str, role: Role, area_id: Option<i32>| NewUser {
            username: username.to_string(),
            display_name: username.to_string(),
            email: format!("{}@desk.test", username),
            password_hash: "x".into(),
            role,
            area_id,
            active: true,
        };
        let it_agent = store.insert_user(agent("ana", Role::AreaAgent, Some(area.id))).await.unwrap();
        let user = store.insert_user(agent("bob", Role::User, None)).await.unwrap();

        assert_eq!(store.set_area_active(area.id, false).await.unwrap(), 1);
        assert!(!store.find_user(it_agent.id).await.unwrap().unwrap().active);
        assert!(store.find_user(user.id).await.unwrap().unwrap().active);
        assert!(!store.find_area(area.id).await.unwrap().unwrap().active);
    }
}
