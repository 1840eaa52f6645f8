use std::collections::HashMap;

use tokio::sync::RwLock;

use ticketry_core::domain::attachment::{AttachmentId, AttachmentMeta};
use ticketry_core::domain::category::{Category, CategoryId, Subcategory, SubcategoryId};
use ticketry_core::domain::request::{Request, RequestId, RequestStatus};
use ticketry_core::domain::user::{ManagerRef, User, UserId};

use super::{
    AttachmentRepository, CategoryRepository, RepositoryError, RequestRepository, StatusUpdate,
    UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn manager_of(&self, id: &UserId) -> Result<Option<ManagerRef>, RepositoryError> {
        let users = self.users.read().await;
        let manager = users
            .get(&id.0)
            .and_then(|u| u.reporting_manager_id.as_ref())
            .and_then(|manager_id| users.get(&manager_id.0));
        Ok(manager.map(|m| ManagerRef { id: m.id.clone(), role: m.role }))
    }
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, Request>>,
    /// owner id -> manager id, mirroring users.reporting_manager_id for
    /// the manager listing query.
    reporting: RwLock<HashMap<String, String>>,
}

impl InMemoryRequestRepository {
    pub async fn set_reporting(&self, owner: &UserId, manager: &UserId) {
        let mut reporting = self.reporting.write().await;
        reporting.insert(owner.0.clone(), manager.0.clone());
    }
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn save(&self, request: Request) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        Ok(requests.remove(&id.0).is_some())
    }

    async fn apply_transition(&self, update: StatusUpdate) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;

        match update {
            StatusUpdate::ManagerApproval { id, expected, approver, remarks, at } => {
                let Some(request) = requests.get_mut(&id.0).filter(|r| r.status == expected)
                else {
                    return Ok(false);
                };
                request.status = RequestStatus::PendingItHod;
                request.approved_by_manager_id = Some(approver);
                request.approved_by_manager_date = Some(at);
                request.manager_remarks = remarks;
                request.updated_at = at;
            }
            StatusUpdate::ItApproval { id, expected, approver, remarks, at, combined } => {
                let Some(request) = requests.get_mut(&id.0).filter(|r| r.status == expected)
                else {
                    return Ok(false);
                };
                request.status = RequestStatus::Approved;
                if combined {
                    request.approved_by_manager_id = Some(approver.clone());
                    request.approved_by_manager_date = Some(at);
                }
                request.approved_by_it_manager_id = Some(approver);
                request.approved_by_it_manager_date = Some(at);
                request.it_manager_remarks = remarks;
                request.updated_at = at;
            }
            StatusUpdate::Rejection { id, expected, rejected_by, remarks, at } => {
                let Some(request) = requests.get_mut(&id.0).filter(|r| r.status == expected)
                else {
                    return Ok(false);
                };
                request.status = RequestStatus::Rejected;
                request.rejected_by_id = Some(rejected_by);
                request.rejected_date = Some(at);
                request.rejection_remarks = Some(remarks);
                request.updated_at = at;
            }
        }

        Ok(true)
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut result: Vec<Request> =
            requests.values().filter(|r| r.user_id == *owner).cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_for_manager(&self, manager: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let reporting = self.reporting.read().await;
        let mut result: Vec<Request> = requests
            .values()
            .filter(|r| {
                r.user_id == *manager
                    || reporting.get(&r.user_id.0).is_some_and(|m| *m == manager.0)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_all(&self) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut result: Vec<Request> = requests.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut result: Vec<Request> =
            requests.values().filter(|r| r.status == status).cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: RwLock<HashMap<String, Category>>,
    subcategories: RwLock<HashMap<String, Subcategory>>,
}

#[async_trait::async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_category(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories.get(&id.0).cloned())
    }

    async fn find_subcategory(
        &self,
        id: &SubcategoryId,
    ) -> Result<Option<Subcategory>, RepositoryError> {
        let subcategories = self.subcategories.read().await;
        Ok(subcategories.get(&id.0).cloned())
    }

    async fn save_category(&self, category: Category) -> Result<(), RepositoryError> {
        let mut categories = self.categories.write().await;
        categories.insert(category.id.0.clone(), category);
        Ok(())
    }

    async fn save_subcategory(&self, subcategory: Subcategory) -> Result<(), RepositoryError> {
        let mut subcategories = self.subcategories.write().await;
        subcategories.insert(subcategory.id.0.clone(), subcategory);
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        let mut all: Vec<Category> = categories.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn list_subcategories(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Subcategory>, RepositoryError> {
        let subcategories = self.subcategories.read().await;
        let mut matching: Vec<Subcategory> = subcategories
            .values()
            .filter(|s| s.category_id == *category_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }

    async fn request_count_for_category(&self, _id: &CategoryId) -> Result<i64, RepositoryError> {
        Ok(0)
    }

    async fn request_count_for_subcategory(
        &self,
        _id: &SubcategoryId,
    ) -> Result<i64, RepositoryError> {
        Ok(0)
    }

    async fn subcategory_count_for_category(
        &self,
        id: &CategoryId,
    ) -> Result<i64, RepositoryError> {
        let subcategories = self.subcategories.read().await;
        Ok(subcategories.values().filter(|s| s.category_id == *id).count() as i64)
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool, RepositoryError> {
        let mut categories = self.categories.write().await;
        Ok(categories.remove(&id.0).is_some())
    }

    async fn delete_subcategory(&self, id: &SubcategoryId) -> Result<bool, RepositoryError> {
        let mut subcategories = self.subcategories.write().await;
        Ok(subcategories.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryAttachmentRepository {
    attachments: RwLock<HashMap<String, AttachmentMeta>>,
}

#[async_trait::async_trait]
impl AttachmentRepository for InMemoryAttachmentRepository {
    async fn find_by_id(
        &self,
        id: &AttachmentId,
    ) -> Result<Option<AttachmentMeta>, RepositoryError> {
        let attachments = self.attachments.read().await;
        Ok(attachments.get(&id.0).cloned())
    }

    async fn insert(&self, meta: AttachmentMeta) -> Result<(), RepositoryError> {
        let mut attachments = self.attachments.write().await;
        attachments.insert(meta.id.0.clone(), meta);
        Ok(())
    }

    async fn list_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<AttachmentMeta>, RepositoryError> {
        let attachments = self.attachments.read().await;
        let mut matching: Vec<AttachmentMeta> = attachments
            .values()
            .filter(|a| a.request_id == *request_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(matching)
    }

    async fn count_for_request(&self, request_id: &RequestId) -> Result<i64, RepositoryError> {
        let attachments = self.attachments.read().await;
        Ok(attachments.values().filter(|a| a.request_id == *request_id).count() as i64)
    }

    async fn delete(&self, id: &AttachmentId) -> Result<bool, RepositoryError> {
        let mut attachments = self.attachments.write().await;
        Ok(attachments.remove(&id.0).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use ticketry_core::domain::category::{CategoryId, CompanyId, DepartmentId, SubcategoryId};
    use ticketry_core::domain::request::{Request, RequestId, RequestStatus};
    use ticketry_core::domain::user::{Role, User, UserId};

    use crate::repositories::{
        InMemoryRequestRepository, InMemoryUserRepository, RequestRepository, StatusUpdate,
        UserRepository,
    };

    fn user(id: &str, role: Role, manager: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: UserId(id.to_string()),
            name: id.to_string(),
            email: format!("{id}@corp.test"),
            password_hash: "hash".to_string(),
            role,
            department_id: DepartmentId("d-1".to_string()),
            company_id: CompanyId("c-1".to_string()),
            site_id: None,
            reporting_manager_id: manager.map(|m| UserId(m.to_string())),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(id: &str, owner: &str, status: RequestStatus) -> Request {
        let now = Utc::now();
        Request {
            id: RequestId(id.to_string()),
            title: "title".to_string(),
            description: "description".to_string(),
            category_id: CategoryId("cat".to_string()),
            subcategory_id: SubcategoryId("sub".to_string()),
            user_id: UserId(owner.to_string()),
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

    #[tokio::test]
    async fn manager_of_resolves_through_stored_users() {
        let repo = InMemoryUserRepository::default();
        repo.save(user("u-mgr", Role::Manager, None)).await.expect("save");
        repo.save(user("u-emp", Role::User, Some("u-mgr"))).await.expect("save");

        let manager = repo
            .manager_of(&UserId("u-emp".to_string()))
            .await
            .expect("lookup")
            .expect("manager exists");
        assert_eq!(manager.role, Role::Manager);
    }

    #[tokio::test]
    async fn transition_honours_expected_status() {
        let repo = InMemoryRequestRepository::default();
        repo.save(request("R-1", "u-emp", RequestStatus::PendingManager)).await.expect("save");

        let first = repo
            .apply_transition(StatusUpdate::ManagerApproval {
                id: RequestId("R-1".to_string()),
                expected: RequestStatus::PendingManager,
                approver: UserId("u-mgr".to_string()),
                remarks: None,
                at: Utc::now(),
            })
            .await
            .expect("apply");
        assert!(first);

        let second = repo
            .apply_transition(StatusUpdate::ManagerApproval {
                id: RequestId("R-1".to_string()),
                expected: RequestStatus::PendingManager,
                approver: UserId("u-mgr".to_string()),
                remarks: None,
                at: Utc::now(),
            })
            .await
            .expect("apply again");
        assert!(!second, "second identical transition must find a changed status");
    }
}
