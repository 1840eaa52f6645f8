use std::sync::Arc;

use tracing::info;

use ticketry_core::domain::category::{
    Category, CategoryId, Company, CompanyId, Department, Site, SiteId, Subcategory, SubcategoryId,
};
use ticketry_core::domain::user::{validate_user_fields, Actor, ManagerRef, Role, User};
use ticketry_core::errors::DomainError;

use crate::repositories::{CategoryRepository, OrgRepository, UserRepository};
use crate::service::ServiceError;

/// Maintenance of the reference data the routing engine depends on:
/// accounts, categories, and the org structure. Every operation requires
/// the Admin role.
pub struct AdminService {
    users: Arc<dyn UserRepository>,
    categories: Arc<dyn CategoryRepository>,
    org: Arc<dyn OrgRepository>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        categories: Arc<dyn CategoryRepository>,
        org: Arc<dyn OrgRepository>,
    ) -> Self {
        Self { users, categories, org }
    }

    fn require_admin(actor: &Actor) -> Result<(), ServiceError> {
        if actor.role != Role::Admin {
            return Err(DomainError::PermissionDenied.into());
        }
        Ok(())
    }

    /// Creates or updates an account. The reporting manager, when set, must
    /// exist, be active, and hold an approver role.
    pub async fn save_user(&self, actor: &Actor, user: User) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;

        let (manager_ref, manager_active) = match &user.reporting_manager_id {
            Some(manager_id) => {
                let manager = self
                    .users
                    .find_by_id(manager_id)
                    .await?
                    .ok_or_else(|| DomainError::invalid_reference(format!(
                        "unknown reporting manager: {}",
                        manager_id.0
                    )))?;
                (
                    Some(ManagerRef { id: manager.id.clone(), role: manager.role }),
                    manager.is_active,
                )
            }
            None => (None, true),
        };

        validate_user_fields(
            Some(&user.id),
            &user.name,
            &user.email,
            manager_ref.as_ref(),
            manager_active,
        )
        .map_err(ServiceError::Domain)?;

        self.users.save(user).await?;
        Ok(())
    }

    pub async fn save_category(&self, actor: &Actor, category: Category) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;
        if category.name.trim().is_empty() {
            return Err(DomainError::validation("category name is required").into());
        }
        self.categories.save_category(category).await?;
        Ok(())
    }

    pub async fn save_subcategory(
        &self,
        actor: &Actor,
        subcategory: Subcategory,
    ) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;
        if subcategory.name.trim().is_empty() {
            return Err(DomainError::validation("subcategory name is required").into());
        }
        if self.categories.find_category(&subcategory.category_id).await?.is_none() {
            return Err(DomainError::invalid_reference(format!(
                "unknown category: {}",
                subcategory.category_id.0
            ))
            .into());
        }
        self.categories.save_subcategory(subcategory).await?;
        Ok(())
    }

    /// Deletion is refused while requests or subcategories still reference
    /// the category.
    pub async fn delete_category(
        &self,
        actor: &Actor,
        id: &CategoryId,
    ) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;

        let requests = self.categories.request_count_for_category(id).await?;
        if requests > 0 {
            return Err(DomainError::validation(format!(
                "category is referenced by {requests} request(s)"
            ))
            .into());
        }
        let children = self.categories.subcategory_count_for_category(id).await?;
        if children > 0 {
            return Err(DomainError::validation(format!(
                "category still has {children} subcategorie(s)"
            ))
            .into());
        }

        if !self.categories.delete_category(id).await? {
            return Err(DomainError::not_found("category", id.0.clone()).into());
        }
        info!(category_id = %id.0, actor_id = %actor.id.0, "category deleted");
        Ok(())
    }

    pub async fn delete_subcategory(
        &self,
        actor: &Actor,
        id: &SubcategoryId,
    ) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;

        let requests = self.categories.request_count_for_subcategory(id).await?;
        if requests > 0 {
            return Err(DomainError::validation(format!(
                "subcategory is referenced by {requests} request(s)"
            ))
            .into());
        }

        if !self.categories.delete_subcategory(id).await? {
            return Err(DomainError::not_found("subcategory", id.0.clone()).into());
        }
        info!(subcategory_id = %id.0, actor_id = %actor.id.0, "subcategory deleted");
        Ok(())
    }

    /// Departments must belong to an existing company.
    pub async fn save_department(
        &self,
        actor: &Actor,
        department: Department,
    ) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;
        if department.name.trim().is_empty() {
            return Err(DomainError::validation("department name is required").into());
        }
        if self.org.find_company(&department.company_id).await?.is_none() {
            return Err(DomainError::invalid_reference(format!(
                "unknown company: {}",
                department.company_id.0
            ))
            .into());
        }
        self.org.save_department(department).await?;
        Ok(())
    }

    /// Company names are unique; rows are few enough to check by listing.
    pub async fn save_company(&self, actor: &Actor, company: Company) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;
        if company.name.trim().is_empty() {
            return Err(DomainError::validation("company name is required").into());
        }
        let clash = self
            .org
            .list_companies()
            .await?
            .into_iter()
            .any(|existing| existing.name == company.name && existing.id != company.id);
        if clash {
            return Err(DomainError::validation(format!(
                "company name already in use: {}",
                company.name
            ))
            .into());
        }
        self.org.save_company(company).await?;
        Ok(())
    }

    pub async fn save_site(&self, actor: &Actor, site: Site) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;
        if site.name.trim().is_empty() {
            return Err(DomainError::validation("site name is required").into());
        }
        let clash = self
            .org
            .list_sites()
            .await?
            .into_iter()
            .any(|existing| existing.name == site.name && existing.id != site.id);
        if clash {
            return Err(
                DomainError::validation(format!("site name already in use: {}", site.name)).into()
            );
        }
        self.org.save_site(site).await?;
        Ok(())
    }

    /// Deletion is refused while departments or users still belong to the
    /// company.
    pub async fn delete_company(&self, actor: &Actor, id: &CompanyId) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;

        let departments = self.org.department_count_for_company(id).await?;
        if departments > 0 {
            return Err(DomainError::validation(format!(
                "company has {departments} department(s)"
            ))
            .into());
        }
        let users = self.org.user_count_for_company(id).await?;
        if users > 0 {
            return Err(DomainError::validation(format!("company has {users} user(s)")).into());
        }

        if !self.org.delete_company(id).await? {
            return Err(DomainError::not_found("company", id.0.clone()).into());
        }
        info!(company_id = %id.0, actor_id = %actor.id.0, "company deleted");
        Ok(())
    }

    /// Deletion is refused while users are assigned to the site or
    /// requests reference it.
    pub async fn delete_site(&self, actor: &Actor, id: &SiteId) -> Result<(), ServiceError> {
        Self::require_admin(actor)?;

        let users = self.org.user_count_for_site(id).await?;
        if users > 0 {
            return Err(
                DomainError::validation(format!("site has {users} user(s) assigned")).into()
            );
        }
        let requests = self.org.request_count_for_site(id).await?;
        if requests > 0 {
            return Err(DomainError::validation(format!(
                "site is referenced by {requests} request(s)"
            ))
            .into());
        }

        if !self.org.delete_site(id).await? {
            return Err(DomainError::not_found("site", id.0.clone()).into());
        }
        info!(site_id = %id.0, actor_id = %actor.id.0, "site deleted");
        Ok(())
    }
}
