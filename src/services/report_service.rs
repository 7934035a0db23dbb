use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::database::models::{Request, RequestFilter};
use crate::database::store::Store;
use crate::services::{Principal, ServiceResult};
use crate::types::{RequestStatus, Role};

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_requests: usize,
    pub by_status: Vec<StatusCount>,
    pub average_resolution_hours: Option<f64>,
    pub active_users: usize,
    pub active_areas: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaReport {
    pub area_id: i32,
    pub area_name: String,
    pub total: usize,
    pub open: usize,
    pub resolved: usize,
    pub active_agents: usize,
    pub average_resolution_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub agent_id: i32,
    pub display_name: String,
    pub area_id: Option<i32>,
    pub assigned: usize,
    pub resolved: usize,
    pub in_progress: usize,
    pub resolution_rate: f64,
    pub average_resolution_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeReport {
    pub closed_count: usize,
    pub average_hours: Option<f64>,
    pub min_hours: Option<f64>,
    pub max_hours: Option<f64>,
    pub sla_hours: i64,
    /// Open requests older than the SLA threshold
    pub overdue_open: usize,
}

/// Every report at once, as fed to the workbook export
#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub summary: SummaryReport,
    pub areas: Vec<AreaReport>,
    pub agents: Vec<AgentReport>,
    pub response_times: ResponseTimeReport,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn resolution_hours(request: &Request) -> Option<f64> {
    request
        .closed_at
        .map(|closed| (closed - request.created_at).num_seconds() as f64 / 3600.0)
}

fn average_resolution<'a>(requests: impl IntoIterator<Item = &'a Request>) -> Option<f64> {
    let hours: Vec<f64> = requests.into_iter().filter_map(resolution_hours).collect();
    if hours.is_empty() {
        None
    } else {
        Some(round2(hours.iter().sum::<f64>() / hours.len() as f64))
    }
}

/// Admin dashboards computed from the current store contents
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn Store>,
    sla_hours: i64,
}

impl ReportService {
    pub fn new(store: Arc<dyn Store>, sla_hours: i64) -> Self {
        Self { store, sla_hours }
    }

    async fn all_requests(&self) -> ServiceResult<Vec<Request>> {
        Ok(self.store.list_requests(&RequestFilter::default()).await?)
    }

    pub async fn summary(&self, principal: &Principal) -> ServiceResult<SummaryReport> {
        principal.require_admin()?;
        let requests = self.all_requests().await?;

        let by_status = RequestStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: requests.iter().filter(|r| r.status == status).count(),
            })
            .collect();

        let active_users = self.store.list_users(None).await?.iter().filter(|u| u.active).count();
        let active_areas = self.store.list_areas().await?.iter().filter(|a| a.active).count();

        Ok(SummaryReport {
            total_requests: requests.len(),
            by_status,
            average_resolution_hours: average_resolution(&requests),
            active_users,
            active_areas,
        })
    }

    pub async fn by_area(&self, principal: &Principal) -> ServiceResult<Vec<AreaReport>> {
        principal.require_admin()?;
        let requests = self.all_requests().await?;
        let agents = self.store.list_users(Some(Role::AreaAgent)).await?;

        let mut reports: Vec<AreaReport> = self
            .store
            .list_areas()
            .await?
            .into_iter()
            .map(|area| {
                let in_area: Vec<&Request> =
                    requests.iter().filter(|r| r.area_id == Some(area.id)).collect();
                AreaReport {
                    area_id: area.id,
                    total: in_area.len(),
                    open: in_area.iter().filter(|r| r.status.is_open()).count(),
                    resolved: in_area.iter().filter(|r| r.status.is_resolved()).count(),
                    active_agents: agents
                        .iter()
                        .filter(|u| u.active && u.area_id == Some(area.id))
                        .count(),
                    average_resolution_hours: average_resolution(in_area.iter().copied()),
                    area_name: area.name,
                }
            })
            .collect();

        reports.sort_by(|a, b| b.total.cmp(&a.total).then(a.area_id.cmp(&b.area_id)));
        Ok(reports)
    }

    pub async fn agents(&self, principal: &Principal) -> ServiceResult<Vec<AgentReport>> {
        principal.require_admin()?;
        let requests = self.all_requests().await?;

        let mut reports: Vec<AgentReport> = self
            .store
            .list_users(Some(Role::AreaAgent))
            .await?
            .into_iter()
            .map(|agent| {
                let assigned: Vec<&Request> = requests
                    .iter()
                    .filter(|r| r.assigned_agent_id == Some(agent.id))
                    .collect();
                let resolved = assigned.iter().filter(|r| r.status.is_resolved()).count();
                let resolution_rate = if assigned.is_empty() {
                    0.0
                } else {
                    round2(resolved as f64 * 100.0 / assigned.len() as f64)
                };

                AgentReport {
                    agent_id: agent.id,
                    display_name: agent.display_name,
                    area_id: agent.area_id,
                    assigned: assigned.len(),
                    resolved,
                    in_progress: assigned
                        .iter()
                        .filter(|r| r.status == RequestStatus::InProgress)
                        .count(),
                    resolution_rate,
                    average_resolution_hours: average_resolution(assigned.iter().copied()),
                }
            })
            .collect();

        reports.sort_by(|a, b| b.resolved.cmp(&a.resolved).then(a.agent_id.cmp(&b.agent_id)));
        Ok(reports)
    }

    pub async fn response_times(&self, principal: &Principal) -> ServiceResult<ResponseTimeReport> {
        principal.require_admin()?;
        let requests = self.all_requests().await?;

        let hours: Vec<f64> = requests.iter().filter_map(resolution_hours).collect();
        let min = hours.iter().copied().reduce(f64::min).map(round2);
        let max = hours.iter().copied().reduce(f64::max).map(round2);

        let threshold = Utc::now() - Duration::hours(self.sla_hours);
        let overdue_open = requests
            .iter()
            .filter(|r| r.status.is_open() && r.created_at < threshold)
            .count();

        Ok(ResponseTimeReport {
            closed_count: hours.len(),
            average_hours: average_resolution(&requests),
            min_hours: min,
            max_hours: max,
            sla_hours: self.sla_hours,
            overdue_open,
        })
    }

    pub async fn bundle(&self, principal: &Principal) -> ServiceResult<ReportBundle> {
        Ok(ReportBundle {
            summary: self.summary(principal).await?,
            areas: self.by_area(principal).await?,
            agents: self.agents(principal).await?,
            response_times: self.response_times(principal).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{NewRequestInput, ServiceError};
    use crate::testing::{self, TestContext};
    use crate::types::Priority;

    #[test]
    fn resolution_hours_are_rounded() {
        let mut request = testing::request(1, 5, Some(1));
        request.closed_at = Some(request.created_at + Duration::minutes(100));
        let avg = average_resolution([&request]).unwrap();
        assert_eq!(avg, 1.67);
        assert_eq!(average_resolution(std::iter::empty::<&Request>()), None);
    }

    #[tokio::test]
    async fn reports_need_an_administrator() {
        let ctx = TestContext::new().await.unwrap();
        let agent = ctx.as_principal(&ctx.demo.it_agent);
        assert!(matches!(
            ctx.reports().summary(&agent).await,
            Err(ServiceError::UnauthorizedAction(_))
        ));
    }

    #[tokio::test]
    async fn aggregates_follow_the_workflow() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let agent = ctx.as_principal(&ctx.demo.it_agent);
        let admin = ctx.as_principal(&ctx.demo.admin);
        let requests = ctx.requests();

        let mut ids = Vec::new();
        for subject in ["VPN", "Printer", "Mouse"] {
            let request = requests
                .create(
                    &alice,
                    NewRequestInput {
                        type_id: ctx.demo.hardware.id,
                        subject: subject.into(),
                        description: "Broken".into(),
                        priority: Priority::Medium,
                        attachment: None,
                    },
                )
                .await
                .unwrap();
            ids.push(request.id);
        }
        requests.take(ids[0], &agent).await.unwrap();
        requests
            .change_status(ids[0], RequestStatus::Resolved, None, None, &agent)
            .await
            .unwrap();
        requests.close(ids[0], None, &alice).await.unwrap();
        requests.take(ids[1], &agent).await.unwrap();

        let reports = ctx.reports();
        let summary = reports.summary(&admin).await.unwrap();
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.active_areas, 2);
        assert_eq!(summary.active_users, 7);
        assert!(summary.average_resolution_hours.is_some());

        let areas = reports.by_area(&admin).await.unwrap();
        assert_eq!(areas[0].area_id, ctx.demo.it.id);
        assert_eq!((areas[0].total, areas[0].open, areas[0].resolved), (3, 2, 1));
        assert_eq!(areas[0].active_agents, 2);

        let agents = reports.agents(&admin).await.unwrap();
        assert_eq!(agents[0].agent_id, agent.user_id);
        assert_eq!((agents[0].assigned, agents[0].resolved, agents[0].in_progress), (2, 1, 1));
        assert_eq!(agents[0].resolution_rate, 50.0);

        let times = reports.response_times(&admin).await.unwrap();
        assert_eq!(times.closed_count, 1);
        assert_eq!(times.overdue_open, 0);
        assert_eq!(times.sla_hours, 72);
    }
}
