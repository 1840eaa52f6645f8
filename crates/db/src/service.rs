use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use ticketry_core::domain::attachment::{AttachmentId, AttachmentMeta, AttachmentPolicy};
use ticketry_core::domain::request::{
    Request, RequestDraft, RequestEdit, RequestFacts, RequestId,
};
use ticketry_core::domain::user::Actor;
use ticketry_core::errors::DomainError;
use ticketry_core::events::{ApprovalStage, DomainEvent, EventSink};
use ticketry_core::routing::{approval_outcome, initial_status, rejection_outcome, Stamp};
use ticketry_core::{authz, Role};

use crate::blobstore::BlobStore;
use crate::repositories::{
    AttachmentRepository, CategoryRepository, RepositoryError, RequestRepository, StatusUpdate,
    UserRepository,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("attachment storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// An uploaded file accompanying a create or edit operation.
pub struct NewAttachment {
    pub original_filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub struct RequestDetail {
    pub request: Request,
    pub attachments: Vec<AttachmentMeta>,
}

/// Orchestrates the request lifecycle: authorization, routing, the
/// conditional status writes, attachment storage, and event emission.
/// All policy decisions live in the core engines; this type wires them
/// to the repositories.
pub struct RequestService {
    users: Arc<dyn UserRepository>,
    requests: Arc<dyn RequestRepository>,
    categories: Arc<dyn CategoryRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    blobs: Arc<dyn BlobStore>,
    events: Arc<dyn EventSink>,
    policy: AttachmentPolicy,
}

impl RequestService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        requests: Arc<dyn RequestRepository>,
        categories: Arc<dyn CategoryRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        blobs: Arc<dyn BlobStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            users,
            requests,
            categories,
            attachments,
            blobs,
            events,
            policy: AttachmentPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AttachmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn create_request(
        &self,
        actor: &Actor,
        draft: RequestDraft,
        attachments: Vec<NewAttachment>,
    ) -> Result<Request, ServiceError> {
        draft.validate().map_err(ServiceError::Domain)?;
        self.check_category_pair(&draft.category_id, &draft.subcategory_id).await?;

        let owner = self
            .users
            .find_by_id(&actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", actor.id.0.clone()))?;

        self.policy.check_count(0, attachments.len()).map_err(ServiceError::Domain)?;
        for file in &attachments {
            self.policy
                .check_file(&file.original_filename, file.bytes.len() as u64, &file.mime_type)
                .map_err(ServiceError::Domain)?;
        }

        let manager = self.users.manager_of(&owner.id).await?;
        let status = initial_status(manager.as_ref());
        let now = Utc::now();

        let request = Request {
            id: RequestId(Uuid::new_v4().to_string()),
            title: draft.title,
            description: draft.description,
            category_id: draft.category_id,
            subcategory_id: draft.subcategory_id,
            user_id: owner.id.clone(),
            site_id: draft.site_id,
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
        };

        self.requests.save(request.clone()).await?;
        self.store_attachments(&request.id, attachments).await?;

        info!(
            request_id = %request.id.0,
            owner_id = %request.user_id.0,
            status = request.status.label(),
            "request created"
        );
        self.events.emit(DomainEvent::RequestCreated {
            request_id: request.id.clone(),
            status: request.status,
            actor_id: actor.id.clone(),
            occurred_at: now,
        });

        Ok(request)
    }

    pub async fn edit_request(
        &self,
        actor: &Actor,
        id: &RequestId,
        edit: RequestEdit,
        new_attachments: Vec<NewAttachment>,
    ) -> Result<Request, ServiceError> {
        edit.validate().map_err(ServiceError::Domain)?;

        let mut request = self.load_request(id).await?;
        let facts = self.facts_for(&request).await?;
        if !authz::can_edit(actor, &facts) {
            return Err(DomainError::PermissionDenied.into());
        }

        self.check_category_pair(&edit.category_id, &edit.subcategory_id).await?;

        let existing = self.attachments.count_for_request(id).await?;
        self.policy
            .check_count(existing.max(0) as usize, new_attachments.len())
            .map_err(ServiceError::Domain)?;
        for file in &new_attachments {
            self.policy
                .check_file(&file.original_filename, file.bytes.len() as u64, &file.mime_type)
                .map_err(ServiceError::Domain)?;
        }

        request.title = edit.title;
        request.description = edit.description;
        request.category_id = edit.category_id;
        request.subcategory_id = edit.subcategory_id;
        request.site_id = edit.site_id;
        request.updated_at = Utc::now();

        self.requests.save(request.clone()).await?;
        self.store_attachments(id, new_attachments).await?;

        info!(request_id = %id.0, actor_id = %actor.id.0, "request edited");
        Ok(request)
    }

    pub async fn approve_request(
        &self,
        actor: &Actor,
        id: &RequestId,
        remarks: Option<String>,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(id).await?;
        let facts = self.facts_for(&request).await?;

        if facts.status.is_terminal() {
            return Err(
                DomainError::IllegalTransition { from: facts.status, action: "approve" }.into()
            );
        }
        if !authz::can_approve(actor, &facts) {
            return Err(DomainError::PermissionDenied.into());
        }

        let outcome = approval_outcome(&facts, actor).map_err(ServiceError::Domain)?;
        let now = Utc::now();
        let update = match outcome.stamp {
            Stamp::Manager => StatusUpdate::ManagerApproval {
                id: id.clone(),
                expected: facts.status,
                approver: actor.id.clone(),
                remarks: remarks.clone(),
                at: now,
            },
            Stamp::ItManager => StatusUpdate::ItApproval {
                id: id.clone(),
                expected: facts.status,
                approver: actor.id.clone(),
                remarks: remarks.clone(),
                at: now,
                combined: false,
            },
            Stamp::Combined => StatusUpdate::ItApproval {
                id: id.clone(),
                expected: facts.status,
                approver: actor.id.clone(),
                remarks: remarks.clone(),
                at: now,
                combined: true,
            },
        };

        // The expected status rides in the WHERE clause; a concurrent
        // writer makes this match zero rows instead of double-stamping.
        let applied = self.requests.apply_transition(update).await?;
        if !applied {
            return Err(
                DomainError::IllegalTransition { from: facts.status, action: "approve" }.into()
            );
        }

        let stage = match outcome.stamp {
            Stamp::Manager => ApprovalStage::Manager,
            Stamp::ItManager => ApprovalStage::ItManager,
            Stamp::Combined => ApprovalStage::Combined,
        };
        info!(
            request_id = %id.0,
            actor_id = %actor.id.0,
            next_status = outcome.next_status.label(),
            stage = ?stage,
            "request approved"
        );
        self.events.emit(DomainEvent::RequestApproved {
            request_id: id.clone(),
            status: outcome.next_status,
            stage,
            actor_id: actor.id.clone(),
            occurred_at: now,
        });

        self.load_request(id).await.map_err(Into::into)
    }

    pub async fn reject_request(
        &self,
        actor: &Actor,
        id: &RequestId,
        remarks: String,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(id).await?;
        let facts = self.facts_for(&request).await?;

        let next = rejection_outcome(&facts, actor, &remarks).map_err(ServiceError::Domain)?;
        let now = Utc::now();

        let applied = self
            .requests
            .apply_transition(StatusUpdate::Rejection {
                id: id.clone(),
                expected: facts.status,
                rejected_by: actor.id.clone(),
                remarks,
                at: now,
            })
            .await?;
        if !applied {
            return Err(
                DomainError::IllegalTransition { from: facts.status, action: "reject" }.into()
            );
        }

        info!(request_id = %id.0, actor_id = %actor.id.0, "request rejected");
        self.events.emit(DomainEvent::RequestRejected {
            request_id: id.clone(),
            status: next,
            actor_id: actor.id.clone(),
            occurred_at: now,
        });

        self.load_request(id).await.map_err(Into::into)
    }

    pub async fn delete_request(&self, actor: &Actor, id: &RequestId) -> Result<(), ServiceError> {
        let request = self.load_request(id).await?;
        let facts = self.facts_for(&request).await?;
        if !authz::can_delete(actor, &facts) {
            return Err(DomainError::PermissionDenied.into());
        }

        let attachments = self.attachments.list_for_request(id).await?;
        let deleted = self.requests.delete(id).await?;
        if !deleted {
            return Err(DomainError::not_found("request", id.0.clone()).into());
        }

        // Attachment rows are gone via cascade; the files are cleaned up
        // best-effort and logged when the store disagrees.
        for attachment in attachments {
            if let Err(error) = self.blobs.delete(&attachment.stored_filename).await {
                warn!(
                    request_id = %id.0,
                    stored_filename = %attachment.stored_filename,
                    %error,
                    "failed to remove attachment file"
                );
            }
        }

        info!(request_id = %id.0, actor_id = %actor.id.0, "request deleted");
        self.events.emit(DomainEvent::RequestDeleted {
            request_id: id.clone(),
            actor_id: actor.id.clone(),
            occurred_at: Utc::now(),
        });

        Ok(())
    }

    pub async fn get_request(
        &self,
        actor: &Actor,
        id: &RequestId,
    ) -> Result<RequestDetail, ServiceError> {
        let request = self.load_request(id).await?;
        let facts = self.facts_for(&request).await?;
        if !authz::can_view(actor, &facts) {
            return Err(DomainError::PermissionDenied.into());
        }

        let attachments = self.attachments.list_for_request(id).await?;
        Ok(RequestDetail { request, attachments })
    }

    /// Role-scoped listing: admins and IT managers see everything, a
    /// manager sees their reports' requests plus their own, and everyone
    /// else sees only their own.
    pub async fn list_requests(&self, actor: &Actor) -> Result<Vec<Request>, ServiceError> {
        let listed = match actor.role {
            Role::Admin | Role::ItManager => self.requests.list_all().await?,
            Role::Manager => self.requests.list_for_manager(&actor.id).await?,
            Role::User => self.requests.list_for_owner(&actor.id).await?,
        };
        Ok(listed)
    }

    async fn load_request(&self, id: &RequestId) -> Result<Request, ServiceError> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("request", id.0.clone()).into())
    }

    async fn facts_for(&self, request: &Request) -> Result<RequestFacts, RepositoryError> {
        let manager = self.users.manager_of(&request.user_id).await?;
        Ok(request.facts(manager.map(|m| m.id)))
    }

    async fn check_category_pair(
        &self,
        category_id: &ticketry_core::CategoryId,
        subcategory_id: &ticketry_core::SubcategoryId,
    ) -> Result<(), ServiceError> {
        let category = self.categories.find_category(category_id).await?;
        if category.is_none() {
            return Err(DomainError::invalid_reference(format!(
                "unknown category: {}",
                category_id.0
            ))
            .into());
        }

        let subcategory = self
            .categories
            .find_subcategory(subcategory_id)
            .await?
            .ok_or_else(|| {
                DomainError::invalid_reference(format!(
                    "unknown subcategory: {}",
                    subcategory_id.0
                ))
            })?;
        if subcategory.category_id != *category_id {
            return Err(DomainError::invalid_reference(format!(
                "subcategory {} does not belong to category {}",
                subcategory_id.0, category_id.0
            ))
            .into());
        }

        Ok(())
    }

    async fn store_attachments(
        &self,
        request_id: &RequestId,
        files: Vec<NewAttachment>,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        for file in files {
            let stored_filename =
                format!("{}.{}", Uuid::new_v4(), extension_of(&file.original_filename));

            // File first, row second: a crash between the two leaves an
            // orphan file, never a metadata row pointing at nothing.
            self.blobs.put(&stored_filename, &file.bytes).await?;
            let inserted = self
                .attachments
                .insert(AttachmentMeta {
                    id: AttachmentId(Uuid::new_v4().to_string()),
                    request_id: request_id.clone(),
                    original_filename: file.original_filename,
                    stored_filename: stored_filename.clone(),
                    file_size: file.bytes.len() as u64,
                    mime_type: file.mime_type,
                    uploaded_at: now,
                })
                .await;

            if let Err(error) = inserted {
                if let Err(cleanup) = self.blobs.delete(&stored_filename).await {
                    warn!(%stored_filename, error = %cleanup, "failed to remove orphan file");
                }
                return Err(error.into());
            }
        }
        Ok(())
    }
}

/// Extension taken from the client-supplied name, reduced to a safe
/// alphanumeric token. The rest of the stored filename is server-generated.
fn extension_of(original_filename: &str) -> String {
    let ext = original_filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        "bin".to_string()
    } else {
        ext
    }
}
