//! Request lifecycle: each operation validates against the current request
//! and returns the [`Transition`] to commit. Nothing here touches the store.

use chrono::{DateTime, Utc};

use crate::database::models::{Attachment, NewComment, NewHistoryEntry, Request, User};
use crate::database::store::RequestChange;
use crate::services::{Principal, ServiceError, ServiceResult};
use crate::types::{EventKind, Priority, RequestStatus, Role};

pub const SUBJECT_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 4000;

/// New request state plus the audit rows that go with it
#[derive(Debug, Clone)]
pub struct Transition {
    pub request: Request,
    pub history: Vec<NewHistoryEntry>,
    pub comments: Vec<NewComment>,
}

impl Transition {
    fn start(request: &Request) -> Self {
        Self {
            request: request.clone(),
            history: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn record(
        &mut self,
        actor: &Principal,
        before: RequestStatus,
        note: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.history.push(NewHistoryEntry {
            request_id: self.request.id,
            actor_id: actor.user_id,
            status_before: before,
            status_after: self.request.status,
            note,
            changed_at: at,
        });
    }

    fn comment(&mut self, actor: &Principal, kind: EventKind, text: String, at: DateTime<Utc>) {
        self.comments
            .push(NewComment::system(self.request.id, actor.user_id, kind, text, at));
    }

    pub fn is_noop(&self) -> bool {
        self.history.is_empty() && self.comments.is_empty()
    }

    pub fn into_change(self, expected_version: i32) -> RequestChange {
        RequestChange {
            request: self.request,
            expected_version,
            history: self.history,
            comments: self.comments,
        }
    }
}

/// Moves an area agent may make; administrators may set any status
pub fn allowed_for_agent(from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::*;

    match from {
        New => matches!(to, InProgress | Resolved | Rejected | Cancelled),
        InProgress => matches!(to, Resolved | Rejected | Cancelled),
        Resolved => matches!(to, InProgress | Rejected | Closed | Cancelled),
        Cancelled => matches!(to, Rejected),
        Rejected => matches!(to, Cancelled),
        Closed => false,
    }
}

fn validate_text(field: &str, value: &str, max: usize) -> ServiceResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(ServiceError::business(format!("The {} is required", field)));
    }
    if len > max {
        return Err(ServiceError::business(format!(
            "The {} must be at most {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_subject(subject: &str) -> ServiceResult<String> {
    validate_text("subject", subject, SUBJECT_MAX_CHARS)
}

pub fn validate_description(description: &str) -> ServiceResult<String> {
    validate_text("description", description, DESCRIPTION_MAX_CHARS)
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn ensure_alive(request: &Request, action: &str) -> ServiceResult<()> {
    if request.status.is_dead() {
        return Err(ServiceError::business(format!(
            "Cannot {} a request that is {}",
            action, request.status
        )));
    }
    Ok(())
}

/// Assigned agent working inside the request's own area
fn is_responsible_agent(request: &Request, actor: &Principal) -> bool {
    actor.role == Role::AreaAgent
        && request.assigned_agent_id == Some(actor.user_id)
        && actor.area_id.is_some()
        && actor.area_id == request.area_id
}

fn set_status(request: &mut Request, to: RequestStatus, reason: Option<String>, at: DateTime<Utc>) {
    let from = request.status;
    request.status = to;

    if to == RequestStatus::Rejected {
        request.rejection_reason = reason;
    } else if from == RequestStatus::Rejected {
        request.rejection_reason = None;
    }

    // closedAt is stamped once; Closed <-> Rejected keeps the first stamp
    request.closed_at = match (from.is_closing(), to.is_closing()) {
        (_, false) => None,
        (true, true) => request.closed_at.or(Some(at)),
        (false, true) => Some(at),
    };
}

pub fn assign(
    request: &Request,
    agent: Option<&User>,
    previous: Option<&str>,
    actor: &Principal,
    at: DateTime<Utc>,
) -> ServiceResult<Transition> {
    actor.require_admin()?;
    ensure_alive(request, "assign")?;

    let agent = agent
        .filter(|a| a.role == Role::AreaAgent && a.active)
        .ok_or_else(|| ServiceError::not_found("Agent not found or inactive"))?;
    if agent.area_id != request.area_id {
        return Err(ServiceError::business(
            "The agent does not belong to the request's area",
        ));
    }

    let before = request.status;
    let mut t = Transition::start(request);
    t.request.assigned_agent_id = Some(agent.id);
    if before == RequestStatus::New {
        set_status(&mut t.request, RequestStatus::InProgress, None, at);
    }

    let (kind, text) = match previous {
        Some(old) => (
            EventKind::AgentReassigned,
            format!("Request reassigned from {} to {}", old, agent.display_name),
        ),
        None => (
            EventKind::AgentAssigned,
            format!("Request assigned to {}", agent.display_name),
        ),
    };
    t.record(actor, before, Some(text.clone()), at);
    t.comment(actor, kind, text, at);
    Ok(t)
}

pub fn take(request: &Request, actor: &Principal, at: DateTime<Utc>) -> ServiceResult<Transition> {
    if request.assigned_agent_id.is_some() {
        return Err(ServiceError::business("Request is already assigned"));
    }
    ensure_alive(request, "take")?;

    let own_area = actor.role == Role::AreaAgent
        && actor.area_id.is_some()
        && actor.area_id == request.area_id;
    if !(actor.is_admin() || own_area) {
        return Err(ServiceError::forbidden(
            "Only administrators or agents of the request's area can take it",
        ));
    }

    let before = request.status;
    let mut t = Transition::start(request);
    t.request.assigned_agent_id = Some(actor.user_id);
    if before == RequestStatus::New {
        set_status(&mut t.request, RequestStatus::InProgress, None, at);
    }

    let text = format!("{} took the request", actor.display_name);
    t.record(actor, before, Some(text.clone()), at);
    t.comment(actor, EventKind::AgentAssigned, text, at);
    Ok(t)
}

pub fn unassign(
    request: &Request,
    agent_name: &str,
    actor: &Principal,
    at: DateTime<Utc>,
) -> ServiceResult<Transition> {
    let Some(agent_id) = request.assigned_agent_id else {
        return Err(ServiceError::business("Request has no assigned agent"));
    };
    if !(actor.is_admin() || agent_id == actor.user_id) {
        return Err(ServiceError::forbidden(
            "Only administrators or the assigned agent can unassign",
        ));
    }
    ensure_alive(request, "unassign")?;

    let before = request.status;
    let mut t = Transition::start(request);
    t.request.assigned_agent_id = None;
    if before != RequestStatus::New {
        set_status(&mut t.request, RequestStatus::New, None, at);
    }

    let text = format!("{} was unassigned", agent_name);
    t.record(actor, before, Some(text.clone()), at);
    t.comment(actor, EventKind::AgentUnassigned, text, at);
    Ok(t)
}

pub fn change_status(
    request: &Request,
    to: RequestStatus,
    note: Option<&str>,
    rejection_reason: Option<&str>,
    actor: &Principal,
    at: DateTime<Utc>,
) -> ServiceResult<Transition> {
    let reason = non_blank(rejection_reason);
    if to == RequestStatus::Rejected && reason.is_none() {
        return Err(ServiceError::business("A rejection reason is required"));
    }

    match actor.role {
        Role::Admin | Role::SuperAdmin => {}
        Role::AreaAgent if is_responsible_agent(request, actor) => {}
        Role::AreaAgent => {
            return Err(ServiceError::forbidden(
                "Only the assigned agent of the request's area can change its status",
            ))
        }
        Role::User => {
            return Err(ServiceError::forbidden("Users cannot change request status"))
        }
    }

    let from = request.status;
    if from == to {
        // Every history row records a real move, administrators included
        let message = if actor.is_admin() {
            format!(
                "Request is already {}; administrators may set any status except the current one",
                to
            )
        } else {
            format!("Request is already {}", to)
        };
        return Err(ServiceError::business(message));
    }
    if !actor.is_admin() && !allowed_for_agent(from, to) {
        return Err(ServiceError::business(format!(
            "Transition {} -> {} is not allowed",
            from, to
        )));
    }

    let mut t = Transition::start(request);
    set_status(&mut t.request, to, reason.clone(), at);

    let note = non_blank(note);
    match (to, reason) {
        (RequestStatus::Rejected, Some(reason)) => {
            let note = note.unwrap_or_else(|| format!("Rejected: {}", reason));
            t.record(actor, from, Some(note), at);
            t.comment(actor, EventKind::Rejected, format!("Request rejected: {}", reason), at);
        }
        _ => {
            let mut text = format!("Status changed from {} to {}", from, to);
            if let Some(note) = &note {
                text.push_str(": ");
                text.push_str(note);
            }
            t.record(actor, from, note, at);
            t.comment(actor, EventKind::StatusChanged, text, at);
        }
    }
    Ok(t)
}

pub fn reject(
    request: &Request,
    reason: &str,
    actor: &Principal,
    at: DateTime<Utc>,
) -> ServiceResult<Transition> {
    if !(actor.is_admin() || is_responsible_agent(request, actor)) {
        return Err(ServiceError::forbidden(
            "Only administrators or the assigned agent can reject a request",
        ));
    }
    ensure_alive(request, "reject")?;

    let note = format!("Rejected: {}", reason.trim());
    change_status(request, RequestStatus::Rejected, Some(&note), Some(reason), actor, at)
}

pub fn close(
    request: &Request,
    note: Option<&str>,
    actor: &Principal,
    at: DateTime<Utc>,
) -> ServiceResult<Transition> {
    if request.requester_id != actor.user_id {
        return Err(ServiceError::forbidden("Only the requester can close a request"));
    }
    if request.status != RequestStatus::Resolved {
        return Err(ServiceError::business("Only resolved requests can be closed"));
    }

    let before = request.status;
    let mut t = Transition::start(request);
    set_status(&mut t.request, RequestStatus::Closed, None, at);

    let note = non_blank(note).unwrap_or_else(|| "Closed by requester".to_string());
    t.record(actor, before, Some(note.clone()), at);
    t.comment(
        actor,
        EventKind::StatusChanged,
        format!("Status changed from {} to {}: {}", before, RequestStatus::Closed, note),
        at,
    );
    Ok(t)
}

/// Only the requester may edit, and only while the request is new and unassigned
pub fn ensure_editable(request: &Request, actor: &Principal) -> ServiceResult<()> {
    if request.requester_id != actor.user_id {
        return Err(ServiceError::forbidden("Only the requester can edit a request"));
    }
    if request.status != RequestStatus::New || request.assigned_agent_id.is_some() {
        return Err(ServiceError::business(
            "Only new, unassigned requests can be edited",
        ));
    }
    Ok(())
}

/// Field updates for [`edit`]; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct EditChanges {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    /// `Some(None)` removes the attachment
    pub attachment: Option<Option<Attachment>>,
}

pub fn edit(
    request: &Request,
    changes: EditChanges,
    actor: &Principal,
    at: DateTime<Utc>,
) -> ServiceResult<Transition> {
    ensure_editable(request, actor)?;

    let mut t = Transition::start(request);
    let mut changed = Vec::new();

    if let Some(subject) = changes.subject {
        let subject = validate_subject(&subject)?;
        if subject != t.request.subject {
            t.request.subject = subject;
            changed.push("subject");
        }
    }
    if let Some(description) = changes.description {
        let description = validate_description(&description)?;
        if description != t.request.description {
            t.request.description = description;
            changed.push("description");
        }
    }
    if let Some(priority) = changes.priority {
        if priority != t.request.priority {
            t.request.priority = priority;
            changed.push("priority");
        }
    }
    if let Some(attachment) = changes.attachment {
        if attachment != t.request.attachment {
            t.request.attachment = attachment;
            changed.push("attachment");
        }
    }

    if !changed.is_empty() {
        t.comment(
            actor,
            EventKind::Edited,
            format!("Request edited: {}", changed.join(", ")),
            at,
        );
    }
    Ok(t)
}
