use thiserror::Error;

use crate::domain::request::RequestStatus;

/// Business-rule failures surfaced to callers as recoverable results.
///
/// Infrastructure faults (database, file I/O) are deliberately absent:
/// those belong to the persistence layer, which wraps this enum.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("illegal transition: cannot {action} a request in status {from:?}")]
    IllegalTransition { from: RequestStatus, action: &'static str },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::InvalidReference(message.into())
    }
}
