use chrono::{DateTime, Utc};
use sqlx::Row;

use ticketry_core::domain::category::{CompanyId, DepartmentId, SiteId};
use ticketry_core::domain::user::{ManagerRef, Role, User, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_role(label: &str) -> Result<Role, RepositoryError> {
    Role::parse_label(label)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown role label: {label}")))
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, department_id, company_id,
                            site_id, reporting_manager_id, is_active, created_at, updated_at";

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let password_hash: String =
        row.try_get("password_hash").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_label: String =
        row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department_id: String =
        row.try_get("department_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let company_id: String =
        row.try_get("company_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let site_id: Option<String> =
        row.try_get("site_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reporting_manager_id: Option<String> =
        row.try_get("reporting_manager_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User {
        id: UserId(id),
        name,
        email,
        password_hash,
        role: parse_role(&role_label)?,
        department_id: DepartmentId(department_id),
        company_id: CompanyId(company_id),
        site_id: site_id.map(SiteId),
        reporting_manager_id: reporting_manager_id.map(UserId),
        is_active: is_active != 0,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, department_id, company_id,
                                site_id, reporting_manager_id, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 password_hash = excluded.password_hash,
                 role = excluded.role,
                 department_id = excluded.department_id,
                 company_id = excluded.company_id,
                 site_id = excluded.site_id,
                 reporting_manager_id = excluded.reporting_manager_id,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(&user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.label())
        .bind(&user.department_id.0)
        .bind(&user.company_id.0)
        .bind(user.site_id.as_ref().map(|id| id.0.as_str()))
        .bind(user.reporting_manager_id.as_ref().map(|id| id.0.as_str()))
        .bind(user.is_active as i64)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name ASC"))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_user).collect::<Result<Vec<_>, _>>()
    }

    async fn manager_of(&self, id: &UserId) -> Result<Option<ManagerRef>, RepositoryError> {
        let row = sqlx::query(
            "SELECT m.id, m.role
             FROM users u
             JOIN users m ON m.id = u.reporting_manager_id
             WHERE u.id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let manager_id: String =
            row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let role_label: String =
            row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok(Some(ManagerRef { id: UserId(manager_id), role: parse_role(&role_label)? }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use ticketry_core::domain::category::{CompanyId, DepartmentId};
    use ticketry_core::domain::user::{Role, User, UserId};

    use super::SqlUserRepository;
    use crate::repositories::UserRepository;
    use crate::{connect_memory, fixtures, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::insert_org_baseline(&pool).await.expect("org baseline");
        pool
    }

    fn sample_user(id: &str, role: Role, manager: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: UserId(id.to_string()),
            name: format!("User {id}"),
            email: format!("{id}@corp.test"),
            password_hash: "$2b$12$test-hash".to_string(),
            role,
            department_id: DepartmentId("dept-it".to_string()),
            company_id: CompanyId("co-main".to_string()),
            site_id: None,
            reporting_manager_id: manager.map(|m| UserId(m.to_string())),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_role_labels() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        repo.save(sample_user("u-it", Role::ItManager, None)).await.expect("save");
        let found = repo
            .find_by_id(&UserId("u-it".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.role, Role::ItManager);
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn manager_of_follows_reporting_chain_one_level() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        repo.save(sample_user("u-mgr", Role::Manager, None)).await.expect("save manager");
        repo.save(sample_user("u-emp", Role::User, Some("u-mgr"))).await.expect("save employee");

        let manager = repo
            .manager_of(&UserId("u-emp".to_string()))
            .await
            .expect("lookup")
            .expect("manager should resolve");
        assert_eq!(manager.id.0, "u-mgr");
        assert_eq!(manager.role, Role::Manager);

        let none = repo.manager_of(&UserId("u-mgr".to_string())).await.expect("lookup");
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let user = sample_user("u-1", Role::User, None);
        repo.save(user.clone()).await.expect("save");

        let mut updated = user;
        updated.is_active = false;
        updated.updated_at = Utc::now();
        repo.save(updated).await.expect("upsert");

        let found = repo.find_by_id(&UserId("u-1".to_string())).await.expect("find");
        assert!(!found.expect("should exist").is_active);
    }
}
