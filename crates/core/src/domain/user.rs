use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::category::{CompanyId, DepartmentId, SiteId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Closed role set. Legacy rows carry the display labels ("IT Manager"
/// etc.); mapping happens only at the persistence boundary via
/// [`Role::parse_label`] / [`Role::label`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    ItManager,
    User,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::ItManager => "IT Manager",
            Self::User => "User",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Admin" => Some(Self::Admin),
            "Manager" => Some(Self::Manager),
            "IT Manager" => Some(Self::ItManager),
            "User" => Some(Self::User),
            _ => None,
        }
    }

    /// Roles that may appear as someone's reporting manager.
    pub fn can_manage_reports(self) -> bool {
        matches!(self, Self::Manager | Self::ItManager | Self::Admin)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department_id: DepartmentId,
    pub company_id: CompanyId,
    pub site_id: Option<SiteId>,
    pub reporting_manager_id: Option<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The identity and role a caller acts with. Threaded explicitly through
/// every operation; nothing in the engines reads ambient session state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: UserId(id.into()), role }
    }
}

/// One level of the reporting chain: who approves first, and with what
/// role. The routing engine never walks further than this.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerRef {
    pub id: UserId,
    pub role: Role,
}

/// Field validation applied before a user row is created or updated.
///
/// The manager reference must point at an active user holding an
/// approver role, and a user can never report to themselves.
pub fn validate_user_fields(
    id: Option<&UserId>,
    name: &str,
    email: &str,
    reporting_manager: Option<&ManagerRef>,
    manager_is_active: bool,
) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(DomainError::validation("a valid email address is required"));
    }
    if let Some(manager) = reporting_manager {
        if Some(&manager.id) == id {
            return Err(DomainError::validation("a user cannot report to themselves"));
        }
        if !manager_is_active {
            return Err(DomainError::validation("selected reporting manager is inactive"));
        }
        if !manager.role.can_manage_reports() {
            return Err(DomainError::validation(
                "reporting manager must have Manager, IT Manager, or Admin role",
            ));
        }
    }
    Ok(())
}
