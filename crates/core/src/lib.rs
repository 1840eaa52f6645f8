pub mod authz;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod routing;

pub use authz::{can_approve, can_delete, can_edit, can_view};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::attachment::{AttachmentId, AttachmentMeta, AttachmentPolicy};
pub use domain::category::{Category, CategoryId, Subcategory, SubcategoryId};
pub use domain::request::{
    Request, RequestDraft, RequestEdit, RequestFacts, RequestId, RequestStatus,
};
pub use domain::user::{Actor, ManagerRef, Role, User, UserId};
pub use errors::DomainError;
pub use events::{ApprovalStage, DomainEvent, EventSink, InMemoryEventSink};
pub use routing::{approval_outcome, initial_status, rejection_outcome, ApprovalOutcome, Stamp};
