//! Document exports. A renderer turns a fully resolved [`RequestView`] or
//! the report aggregates into file bytes and never reaches the store.

mod pdf;
mod png;
mod workbook;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ExportConfig;
use crate::services::report_service::ReportBundle;
use crate::services::RequestView;

const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Characters per line before text is wrapped
const WRAP_COLUMNS: usize = 90;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Workbook encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Render task failed: {0}")]
    Task(String),
}

pub trait DocumentRenderer: Send + Sync {
    fn render_pdf(&self, request: &RequestView, generated_at: DateTime<Utc>) -> Result<Vec<u8>, RenderError>;
    fn render_png(&self, request: &RequestView, generated_at: DateTime<Utc>) -> Result<Vec<u8>, RenderError>;
    fn render_workbook(&self, reports: &ReportBundle, generated_at: DateTime<Utc>) -> Result<Vec<u8>, RenderError>;
}

/// Built-in renderer: Type1-font PDF, bitmap-font PNG and a CSV workbook
pub struct BasicRenderer {
    config: ExportConfig,
}

impl BasicRenderer {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }
}

impl DocumentRenderer for BasicRenderer {
    fn render_pdf(&self, request: &RequestView, generated_at: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
        Ok(pdf::render(&layout(request, &self.config.title, generated_at)))
    }

    fn render_png(&self, request: &RequestView, generated_at: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
        let lines = layout(request, &self.config.title, generated_at);
        png::render(&lines, self.config.png_scale)
    }

    fn render_workbook(&self, reports: &ReportBundle, generated_at: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
        workbook::render(reports, generated_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Style {
    Title,
    Heading,
    Body,
    /// Horizontal separator; the line text is empty
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    pub style: Style,
    pub text: String,
}

impl Line {
    fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

/// Greedy word wrap; words longer than `width` are split
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Page content shared by the PDF and PNG exports
pub(crate) fn layout(view: &RequestView, title: &str, generated_at: DateTime<Utc>) -> Vec<Line> {
    let request = &view.request;
    let mut lines = vec![
        Line::new(Style::Title, title),
        Line::new(Style::Title, format!("Request {}", request.number)),
        Line::new(
            Style::Body,
            format!("Status: {}    Priority: {}", request.status, request.priority),
        ),
        Line::new(Style::Rule, ""),
    ];

    let field = |lines: &mut Vec<Line>, label: &str, value: &str| {
        for (i, part) in wrap(&format!("{}: {}", label, value), WRAP_COLUMNS).into_iter().enumerate() {
            let text = if i == 0 { part } else { format!("  {}", part) };
            lines.push(Line::new(Style::Body, text));
        }
    };
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    lines.push(Line::new(Style::Heading, "GENERAL"));
    field(&mut lines, "Number", &request.number);
    field(&mut lines, "Type", &or_dash(&view.type_name));
    field(
        &mut lines,
        "Area",
        &view.area_name.clone().unwrap_or_else(|| "No area".to_string()),
    );
    field(&mut lines, "Created", &request.created_at.format(DATE_FORMAT).to_string());
    if let Some(closed) = request.closed_at {
        field(&mut lines, "Closed", &closed.format(DATE_FORMAT).to_string());
    }

    lines.push(Line::new(Style::Heading, "REQUESTER"));
    field(&mut lines, "Name", &or_dash(&view.requester_name));
    field(&mut lines, "Email", &or_dash(&view.requester_email));
    if request.assigned_agent_id.is_some() {
        field(&mut lines, "Assigned agent", &or_dash(&view.assigned_agent_name));
        if let Some(email) = &view.assigned_agent_email {
            field(&mut lines, "Agent email", email);
        }
    }

    lines.push(Line::new(Style::Heading, "SUBJECT"));
    lines.extend(wrap(&request.subject, WRAP_COLUMNS).into_iter().map(|l| Line::new(Style::Body, l)));
    lines.push(Line::new(Style::Heading, "DESCRIPTION"));
    lines.extend(wrap(&request.description, WRAP_COLUMNS).into_iter().map(|l| Line::new(Style::Body, l)));

    if let Some(reason) = &request.rejection_reason {
        lines.push(Line::new(Style::Heading, "REJECTION REASON"));
        lines.extend(wrap(reason, WRAP_COLUMNS).into_iter().map(|l| Line::new(Style::Body, l)));
    }

    if let Some(comments) = view.comments.as_ref().filter(|c| !c.is_empty()) {
        lines.push(Line::new(Style::Heading, "COMMENTS"));
        for comment in comments {
            let author = comment.author_name.as_deref().unwrap_or("Unknown");
            let entry = format!(
                "{} {}: {}",
                comment.comment.created_at.format(DATE_FORMAT),
                author,
                comment.comment.text
            );
            lines.extend(wrap(&entry, WRAP_COLUMNS).into_iter().map(|l| Line::new(Style::Body, l)));
        }
    }

    lines.push(Line::new(Style::Rule, ""));
    lines.push(Line::new(
        Style::Body,
        format!("Generated at {}", generated_at.format(DATE_FORMAT)),
    ));
    lines
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::models::Comment;
    use crate::services::CommentView;
    use crate::testing;
    use crate::types::{RequestStatus, Role};
    use chrono::TimeZone;

    pub(crate) fn sample_view() -> RequestView {
        let mut request = testing::request(7, 5, Some(2));
        request.number = "SOL-2026-0007".into();
        request.status = RequestStatus::Rejected;
        request.rejection_reason = Some("Duplicate of SOL-2026-0003".into());
        request.assigned_agent_id = Some(20);

        RequestView {
            request,
            area_name: Some("IT Support".into()),
            type_name: Some("Hardware".into()),
            requester_name: Some("Alice".into()),
            requester_email: Some("alice@desk.local".into()),
            assigned_agent_name: Some("Ana IT".into()),
            assigned_agent_email: Some("it.agent@desk.local".into()),
            comments: Some(vec![CommentView {
                comment: Comment {
                    id: 1,
                    request_id: 7,
                    author_id: 20,
                    text: "Already reported".into(),
                    created_at: Utc::now(),
                    is_system: false,
                    event_kind: None,
                },
                author_name: Some("Ana IT".into()),
                author_role: Some(Role::AreaAgent),
                author_area: Some("IT Support".into()),
            }]),
        }
    }

    pub(crate) fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
    }

    #[test]
    fn wrap_breaks_on_words_and_splits_long_ones() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("first\nsecond", 20), vec!["first", "second"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn layout_lists_names_reason_and_comments() {
        let lines = layout(&sample_view(), "REQUEST DESK", generated_at());
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();

        assert_eq!(lines[0], Line::new(Style::Title, "REQUEST DESK"));
        assert!(texts.contains(&"Request SOL-2026-0007"));
        assert!(texts.contains(&"Area: IT Support"));
        assert!(texts.contains(&"Name: Alice"));
        assert!(texts.contains(&"Assigned agent: Ana IT"));
        assert!(texts.contains(&"REJECTION REASON"));
        assert!(texts.iter().any(|t| t.ends_with("Ana IT: Already reported")));
        assert_eq!(texts.last(), Some(&"Generated at 18/10/2026 09:30"));
    }

    #[test]
    fn unassigned_requests_have_no_agent_lines() {
        let mut view = sample_view();
        view.request.assigned_agent_id = None;
        view.request.rejection_reason = None;
        view.comments = None;

        let lines = layout(&view, "DESK", generated_at());
        assert!(!lines.iter().any(|l| l.text.starts_with("Assigned agent")));
        assert!(!lines.iter().any(|l| l.text == "REJECTION REASON" || l.text == "COMMENTS"));
    }

    #[test]
    fn configured_title_heads_both_documents() {
        let renderer = BasicRenderer::new(ExportConfig {
            title: "ACME DESK".into(),
            png_scale: 1,
        });
        let pdf = renderer.render_pdf(&sample_view(), generated_at()).unwrap();
        assert!(String::from_utf8_lossy(&pdf).contains("(ACME DESK) Tj"));

        let png = renderer.render_png(&sample_view(), generated_at()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
