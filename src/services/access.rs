use crate::database::models::Request;
use crate::services::{Principal, ServiceError, ServiceResult};
use crate::types::Role;

/// What the caller wants to reach on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The request itself
    Request,
    /// Its comments and history; the assigned agent keeps access even
    /// outside their area
    Journal,
}

pub fn can_access(request: &Request, principal: &Principal, scope: Scope) -> bool {
    match principal.role {
        Role::Admin | Role::SuperAdmin => true,
        Role::User => request.requester_id == principal.user_id,
        Role::AreaAgent => {
            let same_area = principal.area_id.is_some() && request.area_id == principal.area_id;
            let assigned = request.assigned_agent_id == Some(principal.user_id);
            same_area || (scope == Scope::Journal && assigned)
        }
    }
}

pub fn ensure_access(request: &Request, principal: &Principal, scope: Scope) -> ServiceResult<()> {
    if can_access(request, principal, scope) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(format!(
            "You do not have access to request {}",
            request.number
        )))
    }
}
