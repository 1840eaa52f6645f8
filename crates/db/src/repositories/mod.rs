use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use ticketry_core::domain::attachment::{AttachmentId, AttachmentMeta};
use ticketry_core::domain::category::{
    Category, CategoryId, Company, CompanyId, Department, DepartmentId, Site, SiteId, Subcategory,
    SubcategoryId,
};
use ticketry_core::domain::request::{Request, RequestId, RequestStatus};
use ticketry_core::domain::user::{ManagerRef, User, UserId};

pub mod attachment;
pub mod category;
pub mod memory;
pub mod org;
pub mod request;
pub mod user;

pub use attachment::SqlAttachmentRepository;
pub use category::SqlCategoryRepository;
pub use memory::{
    InMemoryAttachmentRepository, InMemoryCategoryRepository, InMemoryRequestRepository,
    InMemoryUserRepository,
};
pub use org::SqlOrgRepository;
pub use request::SqlRequestRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// One status transition applied as a single conditional write. The
/// `expected` status is part of the WHERE clause; when another writer got
/// there first the update matches zero rows and the caller sees `false`.
#[derive(Clone, Debug)]
pub enum StatusUpdate {
    ManagerApproval {
        id: RequestId,
        expected: RequestStatus,
        approver: UserId,
        remarks: Option<String>,
        at: DateTime<Utc>,
    },
    ItApproval {
        id: RequestId,
        expected: RequestStatus,
        approver: UserId,
        remarks: Option<String>,
        at: DateTime<Utc>,
        /// Stamp the manager-stage audit fields with the same approver
        /// when an IT Manager approves their own direct report.
        combined: bool,
    },
    Rejection {
        id: RequestId,
        expected: RequestStatus,
        rejected_by: UserId,
        remarks: String,
        at: DateTime<Utc>,
    },
}

impl StatusUpdate {
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::ManagerApproval { id, .. }
            | Self::ItApproval { id, .. }
            | Self::Rejection { id, .. } => id,
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// The one-level reporting chain: the user's direct manager, if any.
    async fn manager_of(&self, id: &UserId) -> Result<Option<ManagerRef>, RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;
    async fn save(&self, request: Request) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError>;

    /// Returns `false` when the request was not in the expected status at
    /// write time, in which case nothing was changed.
    async fn apply_transition(&self, update: StatusUpdate) -> Result<bool, RepositoryError>;

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Request>, RepositoryError>;

    /// Requests owned by the manager's direct reports, plus the manager's
    /// own requests.
    async fn list_for_manager(&self, manager: &UserId) -> Result<Vec<Request>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Request>, RepositoryError>;
    async fn list_by_status(&self, status: RequestStatus)
        -> Result<Vec<Request>, RepositoryError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_category(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError>;
    async fn find_subcategory(
        &self,
        id: &SubcategoryId,
    ) -> Result<Option<Subcategory>, RepositoryError>;
    async fn save_category(&self, category: Category) -> Result<(), RepositoryError>;
    async fn save_subcategory(&self, subcategory: Subcategory) -> Result<(), RepositoryError>;
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;
    async fn list_subcategories(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Subcategory>, RepositoryError>;

    /// Deleting reference data is blocked while requests still point at it.
    async fn request_count_for_category(
        &self,
        id: &CategoryId,
    ) -> Result<i64, RepositoryError>;
    async fn request_count_for_subcategory(
        &self,
        id: &SubcategoryId,
    ) -> Result<i64, RepositoryError>;
    async fn subcategory_count_for_category(
        &self,
        id: &CategoryId,
    ) -> Result<i64, RepositoryError>;
    async fn delete_category(&self, id: &CategoryId) -> Result<bool, RepositoryError>;
    async fn delete_subcategory(&self, id: &SubcategoryId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait OrgRepository: Send + Sync {
    async fn find_company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
    async fn find_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Option<Department>, RepositoryError>;
    async fn find_site(&self, id: &SiteId) -> Result<Option<Site>, RepositoryError>;
    async fn save_company(&self, company: Company) -> Result<(), RepositoryError>;
    async fn save_department(&self, department: Department) -> Result<(), RepositoryError>;
    async fn save_site(&self, site: Site) -> Result<(), RepositoryError>;
    async fn list_companies(&self) -> Result<Vec<Company>, RepositoryError>;
    async fn list_departments(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Department>, RepositoryError>;
    async fn list_sites(&self) -> Result<Vec<Site>, RepositoryError>;

    /// Deleting org rows is blocked while anything still references them.
    async fn department_count_for_company(
        &self,
        id: &CompanyId,
    ) -> Result<i64, RepositoryError>;
    async fn user_count_for_company(&self, id: &CompanyId) -> Result<i64, RepositoryError>;
    async fn user_count_for_site(&self, id: &SiteId) -> Result<i64, RepositoryError>;
    async fn request_count_for_site(&self, id: &SiteId) -> Result<i64, RepositoryError>;
    async fn delete_company(&self, id: &CompanyId) -> Result<bool, RepositoryError>;
    async fn delete_site(&self, id: &SiteId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &AttachmentId)
        -> Result<Option<AttachmentMeta>, RepositoryError>;
    async fn insert(&self, meta: AttachmentMeta) -> Result<(), RepositoryError>;
    async fn list_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<AttachmentMeta>, RepositoryError>;
    async fn count_for_request(&self, request_id: &RequestId) -> Result<i64, RepositoryError>;
    async fn delete(&self, id: &AttachmentId) -> Result<bool, RepositoryError>;
}
