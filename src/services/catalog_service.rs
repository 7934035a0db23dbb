use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::database::manager::constraints;
use crate::database::models::{Area, NewArea, NewRequestType, RequestType, User};
use crate::database::store::Store;
use crate::services::{Principal, ServiceError, ServiceResult};
use crate::types::{Priority, Role};

pub const NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSummary {
    #[serde(flatten)]
    pub area: Area,
    /// Active AgenteArea users
    pub agent_count: usize,
    pub request_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AreaUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestTypeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` moves the type to "Other"
    pub area_id: Option<Option<i32>>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityInfo {
    pub value: Priority,
    pub code: u8,
}

fn clean_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::business("Name is required"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(ServiceError::business(format!(
            "Name must be at most {} characters",
            NAME_MAX_CHARS
        )));
    }
    Ok(name.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Areas, request types and the public catalogs built from them
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load_area(&self, id: i32) -> ServiceResult<Area> {
        self.store
            .find_area(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Area {} not found", id)))
    }

    async fn load_request_type(&self, id: i32) -> ServiceResult<RequestType> {
        self.store
            .find_request_type(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Request type {} not found", id)))
    }

    async fn summarize(&self, area: Area, agents: &[User]) -> ServiceResult<AreaSummary> {
        let agent_count = agents
            .iter()
            .filter(|u| u.active && u.area_id == Some(area.id))
            .count();
        let request_count = self.store.count_requests_by_area(area.id).await?;
        Ok(AreaSummary {
            area,
            agent_count,
            request_count,
        })
    }

    pub async fn list_areas(&self, active_only: bool) -> ServiceResult<Vec<AreaSummary>> {
        let agents = self.store.list_users(Some(Role::AreaAgent)).await?;
        let mut summaries = Vec::new();
        for area in self.store.list_areas().await? {
            if active_only && !area.active {
                continue;
            }
            summaries.push(self.summarize(area, &agents).await?);
        }
        Ok(summaries)
    }

    pub async fn get_area(&self, id: i32) -> ServiceResult<AreaSummary> {
        let area = self.load_area(id).await?;
        let agents = self.store.list_users(Some(Role::AreaAgent)).await?;
        self.summarize(area, &agents).await
    }

    pub async fn create_area(
        &self,
        name: &str,
        description: Option<String>,
        principal: &Principal,
    ) -> ServiceResult<Area> {
        principal.require_admin()?;
        let name = clean_name(name)?;

        let area = self
            .store
            .insert_area(NewArea {
                name: name.clone(),
                description: clean_description(description),
            })
            .await
            .map_err(|e| match e {
                e if e.is_unique_violation(constraints::AREA_NAME) => {
                    ServiceError::business(format!("An area named '{}' already exists", name))
                }
                e => e.into(),
            })?;

        info!("Area {} '{}' created by user {}", area.id, area.name, principal.user_id);
        Ok(area)
    }

    /// Deactivation is refused while the area has open requests and otherwise
    /// takes the area's agents down with it; reactivation brings them back.
    pub async fn update_area(
        &self,
        id: i32,
        update: AreaUpdate,
        principal: &Principal,
    ) -> ServiceResult<AreaSummary> {
        principal.require_admin()?;
        let mut area = self.load_area(id).await?;
        let was_active = area.active;

        if let Some(name) = update.name {
            area.name = clean_name(&name)?;
        }
        if update.description.is_some() {
            area.description = clean_description(update.description);
        }

        let toggled = update.active.filter(|active| *active != was_active);
        if toggled == Some(false) {
            let open = self.store.count_open_requests_by_area(id).await?;
            if open > 0 {
                return Err(ServiceError::business(format!(
                    "Cannot deactivate an area with {} open request(s)",
                    open
                )));
            }
        }

        let name = area.name.clone();
        self.store.update_area(&area).await.map_err(|e| match e {
            e if e.is_unique_violation(constraints::AREA_NAME) => {
                ServiceError::business(format!("An area named '{}' already exists", name))
            }
            e => e.into(),
        })?;

        if let Some(active) = toggled {
            let agents = self.store.set_area_active(id, active).await?;
            info!(
                "Area {} {} by user {} ({} agent(s) updated)",
                id,
                if active { "activated" } else { "deactivated" },
                principal.user_id,
                agents
            );
        }

        self.get_area(id).await
    }

    pub async fn delete_area(&self, id: i32, principal: &Principal) -> ServiceResult<()> {
        principal.require_admin()?;
        let area = self.load_area(id).await?;

        if self.store.count_requests_by_area(id).await? > 0 {
            return Err(ServiceError::business("Cannot delete an area that has requests"));
        }
        if self.store.count_users_by_area(id).await? > 0 {
            return Err(ServiceError::business("Cannot delete an area that has users"));
        }
        if !self.store.list_request_types(Some(id)).await?.is_empty() {
            return Err(ServiceError::business("Cannot delete an area that has request types"));
        }

        self.store.delete_area(id).await?;
        info!("Area {} '{}' deleted by user {}", id, area.name, principal.user_id);
        Ok(())
    }

    pub async fn list_request_types(
        &self,
        area_id: Option<i32>,
        active_only: bool,
    ) -> ServiceResult<Vec<RequestType>> {
        let mut types = self.store.list_request_types(area_id).await?;
        if active_only {
            types.retain(|t| t.active);
        }
        Ok(types)
    }

    pub async fn get_request_type(&self, id: i32) -> ServiceResult<RequestType> {
        self.load_request_type(id).await
    }

    pub async fn create_request_type(
        &self,
        name: &str,
        description: Option<String>,
        area_id: Option<i32>,
        principal: &Principal,
    ) -> ServiceResult<RequestType> {
        principal.require_admin()?;
        let name = clean_name(name)?;
        if let Some(area_id) = area_id {
            self.load_area(area_id).await?;
        }

        let request_type = self
            .store
            .insert_request_type(NewRequestType {
                name: name.clone(),
                description: clean_description(description),
                area_id,
            })
            .await
            .map_err(|e| match e {
                e if e.is_unique_violation(constraints::REQUEST_TYPE_NAME) => {
                    ServiceError::business(format!("A request type named '{}' already exists in this area", name))
                }
                e => e.into(),
            })?;

        info!("Request type {} '{}' created by user {}", request_type.id, request_type.name, principal.user_id);
        Ok(request_type)
    }

    pub async fn update_request_type(
        &self,
        id: i32,
        update: RequestTypeUpdate,
        principal: &Principal,
    ) -> ServiceResult<RequestType> {
        principal.require_admin()?;
        let mut request_type = self.load_request_type(id).await?;

        if let Some(name) = update.name {
            request_type.name = clean_name(&name)?;
        }
        if update.description.is_some() {
            request_type.description = clean_description(update.description);
        }
        if let Some(area_id) = update.area_id {
            if let Some(area_id) = area_id {
                self.load_area(area_id).await?;
            }
            request_type.area_id = area_id;
        }
        if let Some(active) = update.active {
            request_type.active = active;
        }

        self.save_request_type(&request_type).await?;
        Ok(request_type)
    }

    pub async fn toggle_request_type(&self, id: i32, principal: &Principal) -> ServiceResult<RequestType> {
        principal.require_admin()?;
        let mut request_type = self.load_request_type(id).await?;
        request_type.active = !request_type.active;
        self.save_request_type(&request_type).await?;

        info!(
            "Request type {} {} by user {}",
            id,
            if request_type.active { "activated" } else { "deactivated" },
            principal.user_id
        );
        Ok(request_type)
    }

    async fn save_request_type(&self, request_type: &RequestType) -> ServiceResult<()> {
        self.store
            .update_request_type(request_type)
            .await
            .map_err(|e| match e {
                e if e.is_unique_violation(constraints::REQUEST_TYPE_NAME) => ServiceError::business(format!(
                    "A request type named '{}' already exists in this area",
                    request_type.name
                )),
                e => e.into(),
            })
    }

    pub async fn delete_request_type(&self, id: i32, principal: &Principal) -> ServiceResult<()> {
        principal.require_admin()?;
        self.load_request_type(id).await?;

        let in_use = self.store.count_requests_by_type(id).await?;
        if in_use > 0 {
            return Err(ServiceError::business(format!(
                "Cannot delete a request type used by {} request(s); deactivate it instead",
                in_use
            )));
        }

        self.store.delete_request_type(id).await?;
        info!("Request type {} deleted by user {}", id, principal.user_id);
        Ok(())
    }

    pub fn priorities(&self) -> Vec<PriorityInfo> {
        Priority::ALL
            .into_iter()
            .map(|value| PriorityInfo {
                value,
                code: value.code(),
            })
            .collect()
    }

    /// Active agents of an active area, for assignment pickers
    pub async fn area_agents(&self, area_id: i32) -> ServiceResult<Vec<User>> {
        self.load_area(area_id).await?;
        let mut agents = self.store.list_users(Some(Role::AreaAgent)).await?;
        agents.retain(|u| u.active && u.area_id == Some(area_id));
        Ok(agents)
    }
}
