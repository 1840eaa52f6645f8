//! Authorization predicates over (actor, request) pairs.
//!
//! All four are pure functions of the actor's role and id, the request's
//! status, and the owner's direct reporting manager. Every mutating
//! operation consults these before touching the store, and the
//! presentation layer uses the same predicates to decide which actions to
//! expose.

use crate::domain::request::{RequestFacts, RequestStatus};
use crate::domain::user::{Actor, Role};

/// Admins and IT managers see everything; owners see their own requests;
/// a regular manager sees only their direct reports' requests.
pub fn can_view(actor: &Actor, facts: &RequestFacts) -> bool {
    match actor.role {
        Role::Admin | Role::ItManager => true,
        _ if actor.id == facts.owner_id => true,
        Role::Manager => facts.owner_manager_id.as_ref() == Some(&actor.id),
        _ => false,
    }
}

/// Owners may edit until the first approval stamp lands. A request that
/// opens at PendingItHod has no stamp yet and stays editable. Admin
/// overrides regardless of status.
pub fn can_edit(actor: &Actor, facts: &RequestFacts) -> bool {
    if actor.role == Role::Admin {
        return true;
    }
    actor.id == facts.owner_id
        && !matches!(
            facts.status,
            RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::ApprovedByManager
        )
}

pub fn can_approve(actor: &Actor, facts: &RequestFacts) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Manager => {
            facts.owner_manager_id.as_ref() == Some(&actor.id)
                && facts.status == RequestStatus::PendingManager
        }
        Role::ItManager => matches!(
            facts.status,
            RequestStatus::ApprovedByManager | RequestStatus::PendingItHod
        ),
        Role::User => false,
    }
}

/// Deletion mirrors editing: owner only before any approval, Admin always.
pub fn can_delete(actor: &Actor, facts: &RequestFacts) -> bool {
    if actor.role == Role::Admin {
        return true;
    }
    actor.id == facts.owner_id && facts.status == RequestStatus::PendingManager
}
