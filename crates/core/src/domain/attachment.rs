use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub id: AttachmentId,
    pub request_id: RequestId,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Upload limits for request attachments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPolicy {
    pub max_files: usize,
    pub max_file_size: u64,
}

pub const ALLOWED_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/gif", "application/pdf"];

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self { max_files: 3, max_file_size: 5 * 1024 * 1024 }
    }
}

impl AttachmentPolicy {
    /// Validates one incoming file against type and size limits, and the
    /// whole batch against the per-request count cap. `existing` counts
    /// attachments already stored on the request, so edits cannot sneak
    /// past the cap by uploading in batches.
    pub fn check_file(
        &self,
        original_filename: &str,
        file_size: u64,
        mime_type: &str,
    ) -> Result<(), DomainError> {
        if !ALLOWED_MIME_TYPES.contains(&mime_type) {
            return Err(DomainError::validation(format!(
                "file type not allowed for: {original_filename}"
            )));
        }
        if file_size > self.max_file_size {
            return Err(DomainError::validation(format!("file too large: {original_filename}")));
        }
        Ok(())
    }

    pub fn check_count(&self, existing: usize, incoming: usize) -> Result<(), DomainError> {
        if existing + incoming > self.max_files {
            return Err(DomainError::validation(format!(
                "maximum {} attachments allowed (request already has {existing})",
                self.max_files
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AttachmentPolicy;

    #[test]
    fn rejects_disallowed_mime_type() {
        let policy = AttachmentPolicy::default();
        assert!(policy.check_file("tool.exe", 100, "application/x-msdownload").is_err());
        assert!(policy.check_file("scan.pdf", 100, "application/pdf").is_ok());
    }

    #[test]
    fn rejects_oversized_file() {
        let policy = AttachmentPolicy::default();
        assert!(policy.check_file("big.png", 5 * 1024 * 1024 + 1, "image/png").is_err());
        assert!(policy.check_file("ok.png", 5 * 1024 * 1024, "image/png").is_ok());
    }

    #[test]
    fn count_cap_includes_existing_attachments() {
        let policy = AttachmentPolicy::default();
        assert!(policy.check_count(2, 1).is_ok());
        assert!(policy.check_count(2, 2).is_err());
        assert!(policy.check_count(0, 4).is_err());
    }
}
