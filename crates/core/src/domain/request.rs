use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::category::{CategoryId, SiteId, SubcategoryId};
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// One canonical name per approval stage. The legacy system wrote both
/// "Pending Manager" and "Pending HOD" for the first stage; both parse to
/// [`RequestStatus::PendingManager`], and only the canonical label is ever
/// written back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    PendingManager,
    ApprovedByManager,
    PendingItHod,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::PendingManager => "Pending Manager",
            Self::ApprovedByManager => "Approved by Manager",
            Self::PendingItHod => "Pending IT HOD",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Pending Manager" | "Pending HOD" => Some(Self::PendingManager),
            "Approved by Manager" => Some(Self::ApprovedByManager),
            "Pending IT HOD" => Some(Self::PendingItHod),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Approved and Rejected absorb: no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub subcategory_id: SubcategoryId,
    pub user_id: UserId,
    pub site_id: Option<SiteId>,
    pub status: RequestStatus,
    pub approved_by_manager_id: Option<UserId>,
    pub approved_by_manager_date: Option<DateTime<Utc>>,
    pub manager_remarks: Option<String>,
    pub approved_by_it_manager_id: Option<UserId>,
    pub approved_by_it_manager_date: Option<DateTime<Utc>>,
    pub it_manager_remarks: Option<String>,
    pub rejected_by_id: Option<UserId>,
    pub rejected_date: Option<DateTime<Utc>>,
    pub rejection_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self.status, next),
            (RequestStatus::PendingManager, RequestStatus::ApprovedByManager)
                | (RequestStatus::PendingManager, RequestStatus::PendingItHod)
                | (RequestStatus::ApprovedByManager, RequestStatus::Approved)
                | (RequestStatus::PendingItHod, RequestStatus::Approved)
                | (RequestStatus::PendingManager, RequestStatus::Rejected)
                | (RequestStatus::ApprovedByManager, RequestStatus::Rejected)
                | (RequestStatus::PendingItHod, RequestStatus::Rejected)
        )
    }

    /// The minimal slice of a request the authorization and routing
    /// predicates need. Carrying the owner's direct manager id here keeps
    /// the predicates pure over data instead of reaching into a store.
    pub fn facts(&self, owner_manager_id: Option<UserId>) -> RequestFacts {
        RequestFacts { owner_id: self.user_id.clone(), owner_manager_id, status: self.status }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFacts {
    pub owner_id: UserId,
    pub owner_manager_id: Option<UserId>,
    pub status: RequestStatus,
}

/// Input for creating a request, before routing assigns a status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestDraft {
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub subcategory_id: SubcategoryId,
    pub site_id: Option<SiteId>,
}

impl RequestDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }
        Ok(())
    }
}

/// Fields an edit may change. The owner and status are never editable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestEdit {
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub subcategory_id: SubcategoryId,
    pub site_id: Option<SiteId>,
}

impl RequestEdit {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::category::{CategoryId, SubcategoryId};
    use crate::domain::user::UserId;

    use super::{Request, RequestDraft, RequestId, RequestStatus};

    fn request(status: RequestStatus) -> Request {
        let now = Utc::now();
        Request {
            id: RequestId("R-1".into()),
            title: "Replace laptop battery".into(),
            description: "Battery drains within an hour.".into(),
            category_id: CategoryId("cat-hw".into()),
            subcategory_id: SubcategoryId("sub-laptop".into()),
            user_id: UserId("u-1".into()),
            site_id: None,
            status,
            approved_by_manager_id: None,
            approved_by_manager_date: None,
            manager_remarks: None,
            approved_by_it_manager_id: None,
            approved_by_it_manager_date: None,
            it_manager_remarks: None,
            rejected_by_id: None,
            rejected_date: None,
            rejection_remarks: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn legacy_pending_hod_label_parses_to_pending_manager() {
        assert_eq!(RequestStatus::parse_label("Pending HOD"), Some(RequestStatus::PendingManager));
        assert_eq!(
            RequestStatus::parse_label("Pending Manager"),
            Some(RequestStatus::PendingManager)
        );
        assert_eq!(RequestStatus::PendingManager.label(), "Pending Manager");
    }

    #[test]
    fn terminal_states_absorb() {
        for terminal in [RequestStatus::Approved, RequestStatus::Rejected] {
            let request = request(terminal);
            for next in [
                RequestStatus::PendingManager,
                RequestStatus::ApprovedByManager,
                RequestStatus::PendingItHod,
                RequestStatus::Approved,
                RequestStatus::Rejected,
            ] {
                assert!(!request.can_transition_to(next), "{terminal:?} -> {next:?} must be blocked");
            }
        }
    }

    #[test]
    fn rejection_is_reachable_from_every_pending_stage() {
        for pending in [
            RequestStatus::PendingManager,
            RequestStatus::ApprovedByManager,
            RequestStatus::PendingItHod,
        ] {
            assert!(request(pending).can_transition_to(RequestStatus::Rejected));
        }
    }

    #[test]
    fn draft_requires_title_and_description() {
        let draft = RequestDraft {
            title: "  ".into(),
            description: "details".into(),
            category_id: CategoryId("c".into()),
            subcategory_id: SubcategoryId("s".into()),
            site_id: None,
        };
        assert!(draft.validate().is_err());

        let draft = RequestDraft { title: "VPN access".into(), description: String::new(), ..draft };
        assert!(draft.validate().is_err());
    }
}
