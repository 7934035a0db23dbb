//! Fixtures shared by the unit tests

use chrono::Utc;
use std::sync::Arc;

use crate::blob::MemoryBlobStore;
use crate::config::AppConfig;
use crate::database::models::{Request, User};
use crate::database::seed::{seed_demo, DemoData};
use crate::database::MemoryStore;
use crate::services::{
    CatalogService, CommentService, Principal, ReportService, RequestService, UserService,
};
use crate::types::{Priority, RequestStatus, Role};

pub fn principal(user_id: i32, role: Role, area_id: Option<i32>) -> Principal {
    Principal {
        user_id,
        role,
        area_id,
        display_name: format!("user{}", user_id),
    }
}

pub fn user(id: i32, role: Role, area_id: Option<i32>) -> User {
    User {
        id,
        username: format!("user{}", id),
        display_name: format!("User {}", id),
        email: format!("user{}@desk.test", id),
        password_hash: String::new(),
        role,
        area_id,
        active: true,
        created_at: Utc::now(),
    }
}

/// A new, unassigned request
pub fn request(id: i32, requester_id: i32, area_id: Option<i32>) -> Request {
    Request {
        id,
        number: format!("SOL-2026-{:04}", id),
        subject: "Laptop does not boot".into(),
        description: "Black screen after the update".into(),
        priority: Priority::Medium,
        status: RequestStatus::New,
        created_at: Utc::now(),
        closed_at: None,
        area_id,
        type_id: 1,
        requester_id,
        assigned_agent_id: None,
        rejection_reason: None,
        attachment: None,
        version: 0,
    }
}

/// In-memory store seeded with the demo catalog and accounts
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub config: Arc<AppConfig>,
    pub demo: DemoData,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let demo = seed_demo(store.as_ref())
            .await?
            .ok_or_else(|| anyhow::anyhow!("fresh store already seeded"))?;

        Ok(Self {
            store,
            blobs: Arc::new(MemoryBlobStore::new()),
            config: Arc::new(AppConfig::default()),
            demo,
        })
    }

    pub fn requests(&self) -> RequestService {
        RequestService::new(self.store.clone(), self.blobs.clone())
    }

    pub fn comments(&self) -> CommentService {
        CommentService::new(self.store.clone())
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.store.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.store.clone(), self.config.workflow.sla_hours)
    }

    pub fn as_principal(&self, user: &User) -> Principal {
        Principal::from(user)
    }
}
