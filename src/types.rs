/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a stored or submitted string does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// User roles. Wire and storage names follow the desk's role catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Usuario")]
    User,
    #[serde(rename = "Administrador")]
    Admin,
    #[serde(rename = "SuperAdministrador")]
    SuperAdmin,
    #[serde(rename = "AgenteArea")]
    AreaAgent,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Admin, Role::SuperAdmin, Role::AreaAgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "Usuario",
            Role::Admin => "Administrador",
            Role::SuperAdmin => "SuperAdministrador",
            Role::AreaAgent => "AgenteArea",
        }
    }

    /// Administrador and SuperAdministrador see and manage every request
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("role", s))
    }
}

/// Request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    New,
    InProgress,
    Resolved,
    Closed,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 6] = [
        RequestStatus::New,
        RequestStatus::InProgress,
        RequestStatus::Resolved,
        RequestStatus::Closed,
        RequestStatus::Rejected,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "New",
            RequestStatus::InProgress => "InProgress",
            RequestStatus::Resolved => "Resolved",
            RequestStatus::Closed => "Closed",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Cancelled => "Cancelled",
        }
    }

    /// No assignment, comment or rejection is accepted in these states
    pub fn is_dead(&self) -> bool {
        matches!(
            self,
            RequestStatus::Closed | RequestStatus::Rejected | RequestStatus::Cancelled
        )
    }

    /// States that carry a `closed_at` timestamp
    pub fn is_closing(&self) -> bool {
        matches!(self, RequestStatus::Closed | RequestStatus::Rejected)
    }

    /// Work still pending on the desk
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::New | RequestStatus::InProgress)
    }

    /// Outcome counted as solved in reports
    pub fn is_resolved(&self) -> bool {
        matches!(self, RequestStatus::Resolved | RequestStatus::Closed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("status", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Legacy numeric code used by older clients (1 = Low .. 3 = High)
    pub fn code(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed) || p.code().to_string() == trimmed)
            .ok_or_else(|| ParseEnumError::new("priority", s))
    }
}

/// Kind of event a system-generated comment records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    StatusChanged,
    AgentAssigned,
    AgentReassigned,
    AgentUnassigned,
    Edited,
    Rejected,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Created,
        EventKind::StatusChanged,
        EventKind::AgentAssigned,
        EventKind::AgentReassigned,
        EventKind::AgentUnassigned,
        EventKind::Edited,
        EventKind::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "Created",
            EventKind::StatusChanged => "StatusChanged",
            EventKind::AgentAssigned => "AgentAssigned",
            EventKind::AgentReassigned => "AgentReassigned",
            EventKind::AgentUnassigned => "AgentUnassigned",
            EventKind::Edited => "Edited",
            EventKind::Rejected => "Rejected",
        }
    }
}

impl FromStr for EventKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("event kind", s))
    }
}
