use std::sync::Arc;

use crate::blob::BlobStore;
use crate::config::AppConfig;
use crate::database::Store;
use crate::render::{BasicRenderer, DocumentRenderer};
use crate::services::{
    AuthService, CatalogService, CommentService, ExportService, ReportService, RequestService,
    UserService,
};

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>, config: AppConfig) -> Self {
        let renderer = Arc::new(BasicRenderer::new(config.export.clone()));
        Self {
            store,
            blobs,
            renderer,
            config: Arc::new(config),
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.store.clone(), self.config.security.clone())
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

    pub fn exports(&self) -> ExportService {
        ExportService::new(self.requests(), self.reports(), self.renderer.clone())
    }
}
