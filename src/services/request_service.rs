use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::blob::BlobStore;
use crate::database::models::{Attachment, NewComment, NewRequest, Request, RequestFilter};
use crate::database::store::Store;
use crate::services::access::{ensure_access, Scope};
use crate::services::lifecycle::{self, EditChanges, Transition};
use crate::services::views::{RequestView, ViewResolver};
use crate::services::{numbering, retry_on_conflict, Principal, ServiceError, ServiceResult};
use crate::types::{EventKind, Priority, RequestStatus, Role};

/// Uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewRequestInput {
    pub type_id: i32,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub attachment: Option<Upload>,
}

#[derive(Debug, Clone, Default)]
pub enum AttachmentChange {
    #[default]
    Keep,
    Remove,
    Replace(Upload),
}

#[derive(Debug, Clone, Default)]
pub struct EditInput {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub attachment: AttachmentChange,
}

/// Requests and their lifecycle transitions
#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
}

impl RequestService {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    async fn load(&self, id: i32) -> ServiceResult<Request> {
        self.store
            .find_request(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Request {} not found", id)))
    }

    /// Loads the request and runs the access predicate: 404 when missing, 403 when hidden
    pub async fn load_accessible(
        &self,
        id: i32,
        principal: &Principal,
        scope: Scope,
    ) -> ServiceResult<Request> {
        let request = self.load(id).await?;
        ensure_access(&request, principal, scope)?;
        Ok(request)
    }

    async fn commit(&self, current: &Request, transition: Transition) -> ServiceResult<Request> {
        if transition.is_noop() {
            return Ok(current.clone());
        }
        let updated = self
            .store
            .apply_change(transition.into_change(current.version))
            .await?;
        Ok(updated)
    }

    async fn display_name(&self, user_id: i32) -> ServiceResult<String> {
        Ok(self
            .store
            .find_user(user_id)
            .await?
            .map(|u| u.display_name)
            .unwrap_or_else(|| format!("user #{}", user_id)))
    }

    async fn store_upload(&self, upload: Upload) -> ServiceResult<Attachment> {
        let path = self.blobs.put(&upload.bytes, &upload.file_name).await?;
        Ok(Attachment {
            file_name: upload.file_name,
            path,
            content_type: upload.content_type,
        })
    }

    /// Best effort; a leftover blob is only wasted space
    async fn discard_blob(&self, path: &str) {
        if let Err(e) = self.blobs.delete(path).await {
            warn!("Failed to delete attachment blob {}: {}", path, e);
        }
    }

    pub async fn create(&self, principal: &Principal, input: NewRequestInput) -> ServiceResult<Request> {
        let subject = lifecycle::validate_subject(&input.subject)?;
        let description = lifecycle::validate_description(&input.description)?;

        let requester = self
            .store
            .find_user(principal.user_id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| ServiceError::not_found("Requester not found or inactive"))?;
        let request_type = self
            .store
            .find_request_type(input.type_id)
            .await?
            .filter(|t| t.active)
            .ok_or_else(|| ServiceError::not_found("Request type not found or inactive"))?;

        let attachment = match input.attachment {
            Some(upload) => Some(self.store_upload(upload).await?),
            None => None,
        };

        let now = Utc::now();
        let template = NewRequest {
            number: String::new(),
            subject,
            description,
            priority: input.priority,
            area_id: request_type.area_id,
            type_id: request_type.id,
            requester_id: requester.id,
            attachment: attachment.clone(),
            created_at: now,
        };
        let opening = NewComment::system(0, requester.id, EventKind::Created, "Request created", now);

        let store = self.store.as_ref();
        let created = numbering::allocate(store, now.year(), move |number| {
            let request = NewRequest {
                number,
                ..template.clone()
            };
            store.insert_request(request, Some(opening.clone()))
        })
        .await;

        match created {
            Ok(request) => {
                info!(
                    "Request {} created by user {} (type {}, area {:?})",
                    request.number, requester.id, request.type_id, request.area_id
                );
                Ok(request)
            }
            Err(e) => {
                if let Some(attachment) = &attachment {
                    self.discard_blob(&attachment.path).await;
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: i32, principal: &Principal) -> ServiceResult<Request> {
        self.load_accessible(id, principal, Scope::Request).await
    }

    /// Request with its names resolved for the response
    pub async fn present(&self, request: Request) -> ServiceResult<RequestView> {
        ViewResolver::new(self.store.as_ref()).request(request).await
    }

    pub async fn present_all(&self, requests: Vec<Request>) -> ServiceResult<Vec<RequestView>> {
        ViewResolver::new(self.store.as_ref()).requests(requests).await
    }

    /// Detail view: the request plus its comment timeline
    pub async fn detail(&self, id: i32, principal: &Principal) -> ServiceResult<RequestView> {
        self.detail_in(id, principal, Scope::Request).await
    }

    /// Detail view for exports; anyone who may read the journal may export
    pub async fn export_view(&self, id: i32, principal: &Principal) -> ServiceResult<RequestView> {
        self.detail_in(id, principal, Scope::Journal).await
    }

    async fn detail_in(&self, id: i32, principal: &Principal, scope: Scope) -> ServiceResult<RequestView> {
        let request = self.load_accessible(id, principal, scope).await?;
        let comments = self.store.list_comments(request.id).await?;

        let mut resolver = ViewResolver::new(self.store.as_ref());
        let mut view = resolver.request(request).await?;
        view.comments = Some(resolver.comments(comments).await?);
        Ok(view)
    }

    /// Every request, filtered; administrators only
    pub async fn list_all(&self, principal: &Principal, filter: RequestFilter) -> ServiceResult<Vec<Request>> {
        principal.require_admin()?;
        Ok(self.store.list_requests(&filter).await?)
    }

    pub async fn list_mine(&self, principal: &Principal) -> ServiceResult<Vec<Request>> {
        let filter = RequestFilter {
            requester_id: Some(principal.user_id),
            ..Default::default()
        };
        Ok(self.store.list_requests(&filter).await?)
    }

    /// Work queue: everything for administrators, the own area for agents
    pub async fn list_inbox(&self, principal: &Principal) -> ServiceResult<Vec<Request>> {
        match principal.role {
            Role::Admin | Role::SuperAdmin => {
                Ok(self.store.list_requests(&RequestFilter::default()).await?)
            }
            Role::AreaAgent => match principal.area_id {
                Some(area_id) => self.list_area(area_id).await,
                None => Ok(Vec::new()),
            },
            Role::User => Err(ServiceError::forbidden("Users have no request inbox")),
        }
    }

    pub async fn list_by_area(&self, area_id: i32, principal: &Principal) -> ServiceResult<Vec<Request>> {
        let allowed = principal.is_admin()
            || (principal.role == Role::AreaAgent && principal.area_id == Some(area_id));
        if !allowed {
            return Err(ServiceError::forbidden("You do not have access to this area"));
        }
        if self.store.find_area(area_id).await?.is_none() {
            return Err(ServiceError::not_found(format!("Area {} not found", area_id)));
        }
        self.list_area(area_id).await
    }

    async fn list_area(&self, area_id: i32) -> ServiceResult<Vec<Request>> {
        let filter = RequestFilter {
            area_id: Some(area_id),
            ..Default::default()
        };
        Ok(self.store.list_requests(&filter).await?)
    }

    /// New requests nobody has picked up yet
    pub async fn list_unassigned(&self, principal: &Principal) -> ServiceResult<Vec<Request>> {
        principal.require_admin()?;
        let filter = RequestFilter {
            status: Some(RequestStatus::New),
            unassigned_only: true,
            ..Default::default()
        };
        Ok(self.store.list_requests(&filter).await?)
    }

    /// Requests whose type belongs to no area
    pub async fn list_other(&self, principal: &Principal) -> ServiceResult<Vec<Request>> {
        principal.require_admin()?;
        let filter = RequestFilter {
            without_area: true,
            ..Default::default()
        };
        Ok(self.store.list_requests(&filter).await?)
    }

    pub async fn assign(&self, id: i32, agent_id: i32, principal: &Principal) -> ServiceResult<Request> {
        principal.require_admin()?;
        let updated = retry_on_conflict(move || async move {
            let current = self.load_accessible(id, principal, Scope::Request).await?;
            let agent = self.store.find_user(agent_id).await?;
            let previous = match current.assigned_agent_id {
                Some(previous_id) => Some(self.display_name(previous_id).await?),
                None => None,
            };
            let t = lifecycle::assign(&current, agent.as_ref(), previous.as_deref(), principal, Utc::now())?;
            self.commit(&current, t).await
        })
        .await?;

        info!("Request {} assigned to user {} by {}", updated.number, agent_id, principal.user_id);
        Ok(updated)
    }

    pub async fn take(&self, id: i32, principal: &Principal) -> ServiceResult<Request> {
        let updated = retry_on_conflict(move || async move {
            let current = self.load(id).await?;
            let t = lifecycle::take(&current, principal, Utc::now())?;
            self.commit(&current, t).await
        })
        .await?;

        info!("Request {} taken by user {}", updated.number, principal.user_id);
        Ok(updated)
    }

    pub async fn unassign(&self, id: i32, principal: &Principal) -> ServiceResult<Request> {
        let updated = retry_on_conflict(move || async move {
            let current = self.load(id).await?;
            let agent_name = match current.assigned_agent_id {
                Some(agent_id) => self.display_name(agent_id).await?,
                None => String::new(),
            };
            let t = lifecycle::unassign(&current, &agent_name, principal, Utc::now())?;
            self.commit(&current, t).await
        })
        .await?;

        info!("Request {} unassigned by user {}", updated.number, principal.user_id);
        Ok(updated)
    }

    pub async fn change_status(
        &self,
        id: i32,
        status: RequestStatus,
        note: Option<&str>,
        rejection_reason: Option<&str>,
        principal: &Principal,
    ) -> ServiceResult<Request> {
        let updated = retry_on_conflict(move || async move {
            let current = self.load_accessible(id, principal, Scope::Request).await?;
            let t = lifecycle::change_status(&current, status, note, rejection_reason, principal, Utc::now())?;
            self.commit(&current, t).await
        })
        .await?;

        info!("Request {} moved to {} by user {}", updated.number, updated.status, principal.user_id);
        Ok(updated)
    }

    pub async fn reject(&self, id: i32, reason: &str, principal: &Principal) -> ServiceResult<Request> {
        let updated = retry_on_conflict(move || async move {
            let current = self.load_accessible(id, principal, Scope::Request).await?;
            let t = lifecycle::reject(&current, reason, principal, Utc::now())?;
            self.commit(&current, t).await
        })
        .await?;

        info!("Request {} rejected by user {}", updated.number, principal.user_id);
        Ok(updated)
    }

    pub async fn close(&self, id: i32, note: Option<&str>, principal: &Principal) -> ServiceResult<Request> {
        let updated = retry_on_conflict(move || async move {
            let current = self.load_accessible(id, principal, Scope::Request).await?;
            let t = lifecycle::close(&current, note, principal, Utc::now())?;
            self.commit(&current, t).await
        })
        .await?;

        info!("Request {} closed by requester {}", updated.number, principal.user_id);
        Ok(updated)
    }

    pub async fn edit(&self, id: i32, input: EditInput, principal: &Principal) -> ServiceResult<Request> {
        let current = self.load_accessible(id, principal, Scope::Request).await?;
        lifecycle::ensure_editable(&current, principal)?;

        let (attachment, uploaded) = match input.attachment {
            AttachmentChange::Keep => (None, None),
            AttachmentChange::Remove => (Some(None), None),
            AttachmentChange::Replace(upload) => {
                let stored = self.store_upload(upload).await?;
                (Some(Some(stored.clone())), Some(stored))
            }
        };
        let changes = EditChanges {
            subject: input.subject,
            description: input.description,
            priority: input.priority,
            attachment,
        };
        let changes = &changes;

        let result = retry_on_conflict(move || async move {
            let current = self.load_accessible(id, principal, Scope::Request).await?;
            let t = lifecycle::edit(&current, changes.clone(), principal, Utc::now())?;
            let updated = self.commit(&current, t).await?;
            Ok::<_, ServiceError>((updated, current.attachment))
        })
        .await;

        match result {
            Ok((updated, previous)) => {
                let kept = |path: &str| updated.attachment.as_ref().is_some_and(|a| a.path == path);
                if let Some(previous) = previous.filter(|p| !kept(&p.path)) {
                    self.discard_blob(&previous.path).await;
                }
                info!("Request {} edited by requester {}", updated.number, principal.user_id);
                Ok(updated)
            }
            Err(e) => {
                if let Some(uploaded) = uploaded {
                    self.discard_blob(&uploaded.path).await;
                }
                Err(e)
            }
        }
    }

    /// Attachment metadata and bytes, gated like the request itself
    pub async fn attachment(&self, id: i32, principal: &Principal) -> ServiceResult<(Attachment, Vec<u8>)> {
        let request = self.load_accessible(id, principal, Scope::Request).await?;
        let attachment = request
            .attachment
            .ok_or_else(|| ServiceError::not_found("Request has no attachment"))?;
        let bytes = self.blobs.get(&attachment.path).await?;
        Ok((attachment, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobError, MemoryBlobStore};
    use crate::testing::TestContext;

    fn input(type_id: i32, subject: &str) -> NewRequestInput {
        NewRequestInput {
            type_id,
            subject: subject.to_string(),
            description: "Please help".to_string(),
            priority: Priority::High,
            attachment: None,
        }
    }

    #[tokio::test]
    async fn create_derives_area_and_numbers_sequentially() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let service = ctx.requests();

        let first = service.create(&alice, input(ctx.demo.hardware.id, "Mouse")).await.unwrap();
        let second = service.create(&alice, input(ctx.demo.other.id, "Parking")).await.unwrap();

        let year = Utc::now().year();
        assert_eq!(first.number, format!("SOL-{}-0001", year));
        assert_eq!(second.number, format!("SOL-{}-0002", year));
        assert_eq!(first.area_id, Some(ctx.demo.it.id));
        assert_eq!(second.area_id, None);
        assert_eq!(first.status, RequestStatus::New);

        let comments = ctx.store.list_comments(first.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].event_kind, Some(EventKind::Created));
    }

    #[tokio::test]
    async fn create_rejects_unknown_type_and_bad_subject() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let service = ctx.requests();

        assert!(matches!(
            service.create(&alice, input(9999, "Mouse")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.create(&alice, input(ctx.demo.hardware.id, "  ")).await,
            Err(ServiceError::Business(_))
        ));
    }

    #[tokio::test]
    async fn inactive_type_is_refused_before_storing_the_upload() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);

        let mut inactive = ctx.demo.software.clone();
        inactive.active = false;
        ctx.store.update_request_type(&inactive).await.unwrap();

        let mut request = input(ctx.demo.software.id, "License");
        request.attachment = Some(Upload {
            file_name: "license.pdf".into(),
            content_type: Some("application/pdf".into()),
            bytes: b"%PDF".to_vec(),
        });
        assert!(ctx.requests().create(&alice, request).await.is_err());
        assert!(ctx.blobs.is_empty());
    }

    #[tokio::test]
    async fn reading_foreign_requests_is_forbidden_not_missing() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let bob = ctx.as_principal(&ctx.demo.bob);
        let service = ctx.requests();

        let request = service.create(&alice, input(ctx.demo.hardware.id, "Mouse")).await.unwrap();

        assert!(service.get(request.id, &alice).await.is_ok());
        assert!(matches!(
            service.get(request.id, &bob).await,
            Err(ServiceError::UnauthorizedAction(_))
        ));
        assert!(matches!(service.get(9999, &bob).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn full_lifecycle_through_the_store() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let agent = ctx.as_principal(&ctx.demo.it_agent);
        let service = ctx.requests();

        let request = service.create(&alice, input(ctx.demo.hardware.id, "Mouse")).await.unwrap();
        let taken = service.take(request.id, &agent).await.unwrap();
        assert_eq!(taken.status, RequestStatus::InProgress);

        let resolved = service
            .change_status(request.id, RequestStatus::Resolved, Some("Replaced"), None, &agent)
            .await
            .unwrap();
        assert_eq!(resolved.status, RequestStatus::Resolved);

        let closed = service.close(request.id, None, &alice).await.unwrap();
        assert_eq!(closed.status, RequestStatus::Closed);
        assert!(closed.closed_at.is_some());

        let history = ctx.store.list_history(request.id).await.unwrap();
        let steps: Vec<_> = history.iter().map(|h| (h.status_before, h.status_after)).collect();
        assert_eq!(
            steps,
            vec![
                (RequestStatus::New, RequestStatus::InProgress),
                (RequestStatus::InProgress, RequestStatus::Resolved),
                (RequestStatus::Resolved, RequestStatus::Closed),
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_takes_have_one_winner() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let ana = ctx.as_principal(&ctx.demo.it_agent);
        let ivan = ctx.as_principal(&ctx.demo.it_agent2);
        let service = ctx.requests();

        let request = service.create(&alice, input(ctx.demo.hardware.id, "Mouse")).await.unwrap();
        let (a, b) = tokio::join!(service.take(request.id, &ana), service.take(request.id, &ivan));

        assert!(a.is_ok() != b.is_ok());
        let loser = a.err().or(b.err()).unwrap();
        assert!(matches!(loser, ServiceError::Business(msg) if msg.contains("already assigned")));
        assert_eq!(ctx.store.list_history(request.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edit_replaces_attachment_and_drops_old_blob() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let service = ctx.requests();

        let mut create = input(ctx.demo.hardware.id, "Mouse");
        create.attachment = Some(Upload {
            file_name: "old.png".into(),
            content_type: Some("image/png".into()),
            bytes: vec![1, 2, 3],
        });
        let request = service.create(&alice, create).await.unwrap();
        assert_eq!(ctx.blobs.len(), 1);

        let edited = service
            .edit(
                request.id,
                EditInput {
                    subject: Some("Wireless mouse".into()),
                    attachment: AttachmentChange::Replace(Upload {
                        file_name: "new.png".into(),
                        content_type: Some("image/png".into()),
                        bytes: vec![4, 5, 6],
                    }),
                    ..Default::default()
                },
                &alice,
            )
            .await
            .unwrap();

        assert_eq!(edited.subject, "Wireless mouse");
        assert_eq!(edited.attachment.as_ref().map(|a| a.file_name.as_str()), Some("new.png"));
        assert_eq!(ctx.blobs.len(), 1);

        let (_, bytes) = service.attachment(request.id, &alice).await.unwrap();
        assert_eq!(bytes, vec![4, 5, 6]);

        let comments = ctx.store.list_comments(request.id).await.unwrap();
        let edit_comment = comments.last().unwrap();
        assert_eq!(edit_comment.event_kind, Some(EventKind::Edited));
        assert_eq!(edit_comment.text, "Request edited: subject, attachment");
    }

    /// Memory blobs that log every write and delete in call order
    #[derive(Default)]
    struct RecordingBlobs {
        inner: MemoryBlobStore,
        ops: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingBlobs {
        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl BlobStore for RecordingBlobs {
        async fn put(&self, bytes: &[u8], suggested_name: &str) -> Result<String, BlobError> {
            let path = self.inner.put(bytes, suggested_name).await?;
            self.ops.lock().unwrap().push(format!("put {} as {}", suggested_name, path));
            Ok(path)
        }

        async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError> {
            self.inner.get(path).await
        }

        async fn delete(&self, path: &str) -> Result<(), BlobError> {
            self.ops.lock().unwrap().push(format!("delete {}", path));
            self.inner.delete(path).await
        }
    }

    fn png(name: &str, bytes: &[u8]) -> Upload {
        Upload {
            file_name: name.into(),
            content_type: Some("image/png".into()),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn replacement_is_written_before_the_old_blob_is_deleted() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let blobs = Arc::new(RecordingBlobs::default());
        let service = RequestService::new(ctx.store.clone(), blobs.clone());

        let mut create = input(ctx.demo.hardware.id, "Mouse");
        create.attachment = Some(png("old.png", &[1]));
        let request = service.create(&alice, create).await.unwrap();
        let old_path = request.attachment.as_ref().map(|a| a.path.clone()).unwrap();

        let edited = service
            .edit(
                request.id,
                EditInput {
                    attachment: AttachmentChange::Replace(png("new.png", &[2])),
                    ..Default::default()
                },
                &alice,
            )
            .await
            .unwrap();
        let new_path = edited.attachment.as_ref().map(|a| a.path.clone()).unwrap();

        assert_eq!(
            blobs.ops(),
            vec![
                format!("put old.png as {}", old_path),
                format!("put new.png as {}", new_path),
                format!("delete {}", old_path),
            ]
        );
        assert!(blobs.inner.get(&old_path).await.is_err());
    }

    #[tokio::test]
    async fn refused_edit_keeps_the_old_blob_and_drops_the_new_one() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let blobs = Arc::new(RecordingBlobs::default());
        let service = RequestService::new(ctx.store.clone(), blobs.clone());

        let mut create = input(ctx.demo.hardware.id, "Mouse");
        create.attachment = Some(png("old.png", &[1]));
        let request = service.create(&alice, create).await.unwrap();
        let old_path = request.attachment.as_ref().map(|a| a.path.clone()).unwrap();

        let err = service
            .edit(
                request.id,
                EditInput {
                    subject: Some("   ".into()),
                    attachment: AttachmentChange::Replace(png("new.png", &[2])),
                    ..Default::default()
                },
                &alice,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Business(_)));

        let ops = blobs.ops();
        assert_eq!(ops.len(), 3);
        assert!(ops[1].starts_with("put new.png as "));
        let new_path = ops[1].trim_start_matches("put new.png as ").to_string();
        assert_eq!(ops[2], format!("delete {}", new_path));
        assert_eq!(blobs.inner.get(&old_path).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn edit_after_assignment_is_refused() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let admin = ctx.as_principal(&ctx.demo.admin);
        let service = ctx.requests();

        let request = service.create(&alice, input(ctx.demo.hardware.id, "Mouse")).await.unwrap();
        service.assign(request.id, ctx.demo.it_agent.id, &admin).await.unwrap();

        let err = service
            .edit(request.id, EditInput { subject: Some("x".into()), ..Default::default() }, &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Business(_)));
    }

    #[tokio::test]
    async fn inbox_and_admin_views() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let it_agent = ctx.as_principal(&ctx.demo.it_agent);
        let hr_agent = ctx.as_principal(&ctx.demo.hr_agent);
        let admin = ctx.as_principal(&ctx.demo.admin);
        let service = ctx.requests();

        service.create(&alice, input(ctx.demo.hardware.id, "Mouse")).await.unwrap();
        service.create(&alice, input(ctx.demo.payroll.id, "Payslip")).await.unwrap();
        service.create(&alice, input(ctx.demo.other.id, "Parking")).await.unwrap();

        assert_eq!(service.list_inbox(&it_agent).await.unwrap().len(), 1);
        assert_eq!(service.list_inbox(&admin).await.unwrap().len(), 3);
        assert!(service.list_inbox(&alice).await.is_err());
        assert!(matches!(
            service.list_by_area(ctx.demo.it.id, &hr_agent).await,
            Err(ServiceError::UnauthorizedAction(_))
        ));
        assert_eq!(service.list_other(&admin).await.unwrap().len(), 1);
        assert_eq!(service.list_unassigned(&admin).await.unwrap().len(), 3);
        assert_eq!(service.list_mine(&alice).await.unwrap().len(), 3);
    }
}
