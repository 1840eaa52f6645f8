//! Approval routing: pure functions over organisational facts.
//!
//! Two rules here are the easy-to-get-wrong heart of the system and are
//! reproduced exactly from the deployed behaviour:
//!
//! 1. A requester whose direct reporting manager holds the IT Manager role
//!    skips the regular manager stage entirely; the request opens at
//!    `PendingItHod`.
//! 2. When that same IT Manager approves a `PendingItHod` request, the
//!    single action satisfies both stages at once: manager-approval and
//!    IT-approval audit fields are stamped together (a *combined*
//!    approval).

use serde::{Deserialize, Serialize};

use crate::authz::can_approve;
use crate::domain::request::{RequestFacts, RequestStatus};
use crate::domain::user::{Actor, ManagerRef, Role};
use crate::errors::DomainError;

/// Which audit fields an approval action must stamp. The state machine
/// applies all fields of a stamp in the same atomic write as the status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stamp {
    Manager,
    ItManager,
    Combined,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub next_status: RequestStatus,
    pub stamp: Stamp,
}

/// Where a freshly created request enters the chain.
///
/// No manager, or a manager who *is* the IT approval authority, sends the
/// request straight to the IT stage; everyone else starts at the regular
/// manager stage.
pub fn initial_status(manager: Option<&ManagerRef>) -> RequestStatus {
    match manager {
        None => RequestStatus::PendingItHod,
        Some(manager) if manager.role == Role::ItManager => RequestStatus::PendingItHod,
        Some(_) => RequestStatus::PendingManager,
    }
}

/// Computes the transition an approval action performs, or refuses it.
///
/// Callers are expected to have passed [`can_approve`] already; this
/// function still rejects every (role, status) pair outside the legal
/// table so a stale status read can never produce a wrong stamp.
pub fn approval_outcome(
    facts: &RequestFacts,
    actor: &Actor,
) -> Result<ApprovalOutcome, DomainError> {
    match (actor.role, facts.status) {
        (Role::Manager, RequestStatus::PendingManager) => Ok(ApprovalOutcome {
            next_status: RequestStatus::PendingItHod,
            stamp: Stamp::Manager,
        }),
        (
            Role::ItManager | Role::Admin,
            RequestStatus::PendingItHod | RequestStatus::ApprovedByManager,
        ) => {
            let combined = actor.role == Role::ItManager
                && facts.status == RequestStatus::PendingItHod
                && facts.owner_manager_id.as_ref() == Some(&actor.id);
            Ok(ApprovalOutcome {
                next_status: RequestStatus::Approved,
                stamp: if combined { Stamp::Combined } else { Stamp::ItManager },
            })
        }
        _ => Err(DomainError::PermissionDenied),
    }
}

/// Rejection short-circuits the chain from any pending stage. Remarks are
/// mandatory; a rejection without explanation is never permitted.
pub fn rejection_outcome(
    facts: &RequestFacts,
    actor: &Actor,
    remarks: &str,
) -> Result<RequestStatus, DomainError> {
    if remarks.trim().is_empty() {
        return Err(DomainError::validation("rejection remarks are required"));
    }
    if facts.status.is_terminal() {
        return Err(DomainError::IllegalTransition { from: facts.status, action: "reject" });
    }
    if !can_approve(actor, facts) {
        return Err(DomainError::PermissionDenied);
    }
    Ok(RequestStatus::Rejected)
}

#[cfg(test)]
mod tests {
    use crate::domain::request::{RequestFacts, RequestStatus};
    use crate::domain::user::{Actor, ManagerRef, Role, UserId};
    use crate::errors::DomainError;

    use super::{approval_outcome, initial_status, rejection_outcome, Stamp};

    fn facts(status: RequestStatus, manager_id: Option<&str>) -> RequestFacts {
        RequestFacts {
            owner_id: UserId("u-owner".into()),
            owner_manager_id: manager_id.map(|id| UserId(id.into())),
            status,
        }
    }

    #[test]
    fn no_manager_routes_straight_to_it_stage() {
        assert_eq!(initial_status(None), RequestStatus::PendingItHod);
    }

    #[test]
    fn it_manager_as_direct_manager_skips_regular_stage() {
        let manager = ManagerRef { id: UserId("u-it".into()), role: Role::ItManager };
        assert_eq!(initial_status(Some(&manager)), RequestStatus::PendingItHod);
    }

    #[test]
    fn regular_manager_routes_to_manager_stage() {
        let manager = ManagerRef { id: UserId("u-mgr".into()), role: Role::Manager };
        assert_eq!(initial_status(Some(&manager)), RequestStatus::PendingManager);

        let admin = ManagerRef { id: UserId("u-admin".into()), role: Role::Admin };
        assert_eq!(initial_status(Some(&admin)), RequestStatus::PendingManager);
    }

    #[test]
    fn manager_approval_forwards_to_it_stage() {
        let actor = Actor::new("u-mgr", Role::Manager);
        let outcome = approval_outcome(&facts(RequestStatus::PendingManager, Some("u-mgr")), &actor)
            .expect("manager approval");
        assert_eq!(outcome.next_status, RequestStatus::PendingItHod);
        assert_eq!(outcome.stamp, Stamp::Manager);
    }

    #[test]
    fn it_manager_final_approval_stamps_it_fields_only() {
        let actor = Actor::new("u-it", Role::ItManager);
        let outcome = approval_outcome(&facts(RequestStatus::PendingItHod, Some("u-mgr")), &actor)
            .expect("final approval");
        assert_eq!(outcome.next_status, RequestStatus::Approved);
        assert_eq!(outcome.stamp, Stamp::ItManager);
    }

    #[test]
    fn direct_manager_it_manager_gets_combined_stamp() {
        let actor = Actor::new("u-it", Role::ItManager);
        let outcome = approval_outcome(&facts(RequestStatus::PendingItHod, Some("u-it")), &actor)
            .expect("combined approval");
        assert_eq!(outcome.next_status, RequestStatus::Approved);
        assert_eq!(outcome.stamp, Stamp::Combined);
    }

    #[test]
    fn admin_never_receives_combined_stamp() {
        let actor = Actor::new("u-admin", Role::Admin);
        let outcome = approval_outcome(&facts(RequestStatus::PendingItHod, Some("u-admin")), &actor)
            .expect("admin approval");
        assert_eq!(outcome.stamp, Stamp::ItManager);
    }

    #[test]
    fn combined_stamp_requires_pending_it_hod() {
        let actor = Actor::new("u-it", Role::ItManager);
        let outcome =
            approval_outcome(&facts(RequestStatus::ApprovedByManager, Some("u-it")), &actor)
                .expect("approval from legacy status");
        assert_eq!(outcome.stamp, Stamp::ItManager);
    }

    #[test]
    fn illegal_role_status_pairs_are_denied() {
        let manager = Actor::new("u-mgr", Role::Manager);
        assert_eq!(
            approval_outcome(&facts(RequestStatus::PendingItHod, Some("u-mgr")), &manager),
            Err(DomainError::PermissionDenied)
        );

        let employee = Actor::new("u-owner", Role::User);
        assert_eq!(
            approval_outcome(&facts(RequestStatus::PendingManager, Some("u-mgr")), &employee),
            Err(DomainError::PermissionDenied)
        );

        let it = Actor::new("u-it", Role::ItManager);
        assert_eq!(
            approval_outcome(&facts(RequestStatus::Approved, Some("u-mgr")), &it),
            Err(DomainError::PermissionDenied)
        );
    }

    #[test]
    fn rejection_requires_remarks() {
        let actor = Actor::new("u-admin", Role::Admin);
        let result = rejection_outcome(&facts(RequestStatus::PendingManager, None), &actor, "  ");
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejection_from_terminal_status_is_illegal() {
        let actor = Actor::new("u-admin", Role::Admin);
        let result =
            rejection_outcome(&facts(RequestStatus::Rejected, None), &actor, "duplicate request");
        assert!(matches!(result, Err(DomainError::IllegalTransition { .. })));
    }

    #[test]
    fn rejection_allowed_from_any_pending_stage_for_authorized_actor() {
        let admin = Actor::new("u-admin", Role::Admin);
        for status in [
            RequestStatus::PendingManager,
            RequestStatus::ApprovedByManager,
            RequestStatus::PendingItHod,
        ] {
            let next = rejection_outcome(&facts(status, None), &admin, "policy violation")
                .expect("admin rejection");
            assert_eq!(next, RequestStatus::Rejected);
        }
    }

    #[test]
    fn unrelated_manager_cannot_reject() {
        let stranger = Actor::new("u-other", Role::Manager);
        let result = rejection_outcome(
            &facts(RequestStatus::PendingManager, Some("u-mgr")),
            &stranger,
            "not my report",
        );
        assert_eq!(result, Err(DomainError::PermissionDenied));
    }
}
