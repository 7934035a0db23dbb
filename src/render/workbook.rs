//! Report workbook as one CSV file. Each sheet starts with a `# <name>` row
//! followed by its header row.

use chrono::{DateTime, Utc};

use super::{RenderError, DATE_FORMAT};
use crate::services::report_service::ReportBundle;

fn hours(value: Option<f64>) -> String {
    value.map(|h| format!("{:.2}", h)).unwrap_or_default()
}

pub(super) fn render(reports: &ReportBundle, generated_at: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
    let mut out = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());

    let summary = &reports.summary;
    out.write_record(["# Summary"])?;
    out.write_record(["Metric", "Value"])?;
    out.write_record(["Total requests".to_string(), summary.total_requests.to_string()])?;
    for entry in &summary.by_status {
        out.write_record([format!("Requests {}", entry.status), entry.count.to_string()])?;
    }
    out.write_record([
        "Average resolution hours".to_string(),
        hours(summary.average_resolution_hours),
    ])?;
    out.write_record(["Active users".to_string(), summary.active_users.to_string()])?;
    out.write_record(["Active areas".to_string(), summary.active_areas.to_string()])?;
    out.write_record(["Generated at".to_string(), generated_at.format(DATE_FORMAT).to_string()])?;

    out.write_record(["# By area"])?;
    out.write_record(["Area", "Total", "Open", "Resolved", "Active agents", "Average resolution hours"])?;
    for area in &reports.areas {
        out.write_record([
            area.area_name.clone(),
            area.total.to_string(),
            area.open.to_string(),
            area.resolved.to_string(),
            area.active_agents.to_string(),
            hours(area.average_resolution_hours),
        ])?;
    }

    out.write_record(["# By agent"])?;
    out.write_record([
        "Agent",
        "Assigned",
        "Resolved",
        "In progress",
        "Resolution rate %",
        "Average resolution hours",
    ])?;
    for agent in &reports.agents {
        out.write_record([
            agent.display_name.clone(),
            agent.assigned.to_string(),
            agent.resolved.to_string(),
            agent.in_progress.to_string(),
            format!("{:.2}", agent.resolution_rate),
            hours(agent.average_resolution_hours),
        ])?;
    }

    let times = &reports.response_times;
    out.write_record(["# Response times"])?;
    out.write_record(["Metric", "Value"])?;
    out.write_record(["Closed requests".to_string(), times.closed_count.to_string()])?;
    out.write_record(["Average hours".to_string(), hours(times.average_hours)])?;
    out.write_record(["Minimum hours".to_string(), hours(times.min_hours)])?;
    out.write_record(["Maximum hours".to_string(), hours(times.max_hours)])?;
    out.write_record(["SLA hours".to_string(), times.sla_hours.to_string()])?;
    out.write_record(["Open past SLA".to_string(), times.overdue_open.to_string()])?;

    out.into_inner().map_err(|e| RenderError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::generated_at;
    use crate::services::report_service::{
        AgentReport, AreaReport, ResponseTimeReport, StatusCount, SummaryReport,
    };
    use crate::types::RequestStatus;

    fn bundle() -> ReportBundle {
        ReportBundle {
            summary: SummaryReport {
                total_requests: 2,
                by_status: vec![
                    StatusCount { status: RequestStatus::New, count: 1 },
                    StatusCount { status: RequestStatus::Closed, count: 1 },
                ],
                average_resolution_hours: Some(1.5),
                active_users: 7,
                active_areas: 2,
            },
            areas: vec![AreaReport {
                area_id: 1,
                area_name: "IT Support".into(),
                total: 2,
                open: 1,
                resolved: 1,
                active_agents: 2,
                average_resolution_hours: Some(1.5),
            }],
            agents: vec![AgentReport {
                agent_id: 3,
                display_name: "Ana, IT".into(),
                area_id: Some(1),
                assigned: 1,
                resolved: 1,
                in_progress: 0,
                resolution_rate: 100.0,
                average_resolution_hours: None,
            }],
            response_times: ResponseTimeReport {
                closed_count: 1,
                average_hours: Some(1.5),
                min_hours: Some(1.5),
                max_hours: Some(1.5),
                sla_hours: 72,
                overdue_open: 0,
            },
        }
    }

    fn rows(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn every_sheet_is_present_in_order() {
        let bytes = render(&bundle(), generated_at()).unwrap();
        let sheets: Vec<String> = rows(&bytes)
            .into_iter()
            .filter(|r| r[0].starts_with("# "))
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(sheets, vec!["# Summary", "# By area", "# By agent", "# Response times"]);
    }

    #[test]
    fn values_are_quoted_and_formatted() {
        let bytes = render(&bundle(), generated_at()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"Ana, IT\",1,1,0,100.00,\n"));

        let rows = rows(&bytes);
        assert!(rows.contains(&vec!["Requests Closed".to_string(), "1".to_string()]));
        assert!(rows.contains(&vec!["Generated at".to_string(), "18/10/2026 09:30".to_string()]));
        assert!(rows.contains(&vec!["SLA hours".to_string(), "72".to_string()]));
    }
}
