use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::{RequestId, RequestStatus};
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStage {
    Manager,
    ItManager,
    Combined,
}

/// Lifecycle events emitted after a mutation commits. Consumed by external
/// notification/reporting layers; nothing in the core depends on them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    RequestCreated {
        request_id: RequestId,
        status: RequestStatus,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    RequestApproved {
        request_id: RequestId,
        status: RequestStatus,
        stage: ApprovalStage,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    RequestRejected {
        request_id: RequestId,
        status: RequestStatus,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    RequestDeleted {
        request_id: RequestId,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::RequestCreated { request_id, .. }
            | Self::RequestApproved { request_id, .. }
            | Self::RequestRejected { request_id, .. }
            | Self::RequestDeleted { request_id, .. } => request_id,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl InMemoryEventSink {
    pub fn events(&self) -> Vec<DomainEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: DomainEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Sink for callers that do not care about events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::request::{RequestId, RequestStatus};
    use crate::domain::user::UserId;

    use super::{ApprovalStage, DomainEvent, EventSink, InMemoryEventSink};

    #[test]
    fn in_memory_sink_records_events_in_order() {
        let sink = InMemoryEventSink::default();
        sink.emit(DomainEvent::RequestCreated {
            request_id: RequestId("R-1".into()),
            status: RequestStatus::PendingManager,
            actor_id: UserId("u-owner".into()),
            occurred_at: Utc::now(),
        });
        sink.emit(DomainEvent::RequestApproved {
            request_id: RequestId("R-1".into()),
            status: RequestStatus::PendingItHod,
            stage: ApprovalStage::Manager,
            actor_id: UserId("u-mgr".into()),
            occurred_at: Utc::now(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].request_id().0, "R-1");
        assert!(matches!(
            events[1],
            DomainEvent::RequestApproved { stage: ApprovalStage::Manager, .. }
        ));
    }
}
