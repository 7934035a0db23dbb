// handlers/elevated/admin/reports.rs - /api/admin/reports/* handlers

use axum::extract::{Extension, State};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Download};
use crate::services::report_service::{AgentReport, AreaReport, ResponseTimeReport, SummaryReport};
use crate::services::Principal;
use crate::state::AppState;

/// GET /api/admin/reports/summary
pub async fn summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<SummaryReport> {
    Ok(ApiResponse::success(state.reports().summary(&principal).await?))
}

/// GET /api/admin/reports/by-area - Sorted by request count
pub async fn by_area(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<AreaReport>> {
    Ok(ApiResponse::success(state.reports().by_area(&principal).await?))
}

/// GET /api/admin/reports/agents - Sorted by resolved count
pub async fn agents(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<AgentReport>> {
    Ok(ApiResponse::success(state.reports().agents(&principal).await?))
}

/// GET /api/admin/reports/response-times
pub async fn response_times(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<ResponseTimeReport> {
    Ok(ApiResponse::success(state.reports().response_times(&principal).await?))
}

/// GET /api/admin/reports/export - Every report as one CSV workbook
pub async fn export(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Download, ApiError> {
    Ok(state.exports().reports_workbook(&principal).await?.into())
}
