use sqlx::Row;

use ticketry_core::domain::category::{Company, CompanyId, Department, DepartmentId, Site, SiteId};

use super::user::parse_timestamp;
use super::{OrgRepository, RepositoryError};
use crate::DbPool;

/// Companies, departments, and sites. Reference data only; rows are tiny
/// and mutations are rare admin actions.
pub struct SqlOrgRepository {
    pool: DbPool,
}

impl SqlOrgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_company(row: &sqlx::sqlite::SqliteRow) -> Result<Company, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    Ok(Company { id: CompanyId(id), name, created_at: parse_timestamp(&created_at) })
}

fn row_to_department(row: &sqlx::sqlite::SqliteRow) -> Result<Department, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let company_id: String = row.try_get("company_id").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    Ok(Department {
        id: DepartmentId(id),
        name,
        company_id: CompanyId(company_id),
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_site(row: &sqlx::sqlite::SqliteRow) -> Result<Site, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    Ok(Site { id: SiteId(id), name, created_at: parse_timestamp(&created_at) })
}

#[async_trait::async_trait]
impl OrgRepository for SqlOrgRepository {
    async fn find_company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, created_at FROM companies WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_company(r)?)),
            None => Ok(None),
        }
    }

    async fn find_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Option<Department>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, company_id, created_at FROM departments WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_department(r)?)),
            None => Ok(None),
        }
    }

    async fn find_site(&self, id: &SiteId) -> Result<Option<Site>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, created_at FROM sites WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_site(r)?)),
            None => Ok(None),
        }
    }

    async fn save_company(&self, company: Company) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO companies (id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&company.id.0)
        .bind(&company.name)
        .bind(company.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_department(&self, department: Department) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO departments (id, name, company_id, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 company_id = excluded.company_id",
        )
        .bind(&department.id.0)
        .bind(&department.name)
        .bind(&department.company_id.0)
        .bind(department.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_site(&self, site: Site) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sites (id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&site.id.0)
        .bind(&site.name)
        .bind(site.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_companies(&self) -> Result<Vec<Company>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM companies ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_company).collect::<Result<Vec<_>, _>>()
    }

    async fn list_departments(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Department>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, company_id, created_at
             FROM departments WHERE company_id = ? ORDER BY name ASC",
        )
        .bind(&company_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_department).collect::<Result<Vec<_>, _>>()
    }

    async fn list_sites(&self) -> Result<Vec<Site>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM sites ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_site).collect::<Result<Vec<_>, _>>()
    }

    async fn department_count_for_company(
        &self,
        id: &CompanyId,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM departments WHERE company_id = ?")
                .bind(&id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn user_count_for_company(&self, id: &CompanyId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE company_id = ?")
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn user_count_for_site(&self, id: &SiteId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE site_id = ?")
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn request_count_for_site(&self, id: &SiteId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM requests WHERE site_id = ?")
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_company(&self, id: &CompanyId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM companies WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_site(&self, id: &SiteId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM sites WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
