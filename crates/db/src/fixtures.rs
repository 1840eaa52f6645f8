use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

pub const USER_ADMIN: &str = "u-admin";
pub const USER_IT_MANAGER: &str = "u-it-manager";
pub const USER_MANAGER: &str = "u-manager";
/// Reports to [`USER_MANAGER`].
pub const USER_EMPLOYEE: &str = "u-employee";
/// Reports directly to [`USER_IT_MANAGER`]; exercises the combined
/// approval path.
pub const USER_IT_REPORT: &str = "u-it-report";
/// Has no reporting manager at all.
pub const USER_LONER: &str = "u-loner";

pub const CATEGORY_HARDWARE: &str = "cat-hardware";
pub const CATEGORY_SOFTWARE: &str = "cat-software";
pub const SUBCATEGORY_PERIPHERALS: &str = "sub-peripherals";
pub const SUBCATEGORY_LAPTOP: &str = "sub-laptop";
pub const SUBCATEGORY_LICENSES: &str = "sub-licenses";

const SEED_REQUEST_IDS: &[&str] =
    &["req-pending-manager", "req-pending-it", "req-approved", "req-rejected"];

const SEED_USER_IDS: &[&str] =
    &[USER_ADMIN, USER_IT_MANAGER, USER_MANAGER, USER_EMPLOYEE, USER_IT_REPORT, USER_LONER];

/// Deterministic dataset covering every approval path: a regular chain,
/// an IT-managed report, an unmanaged requester, and requests at each
/// lifecycle stage. All seeded accounts use the password "password".
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        // raw_sql, not a prepared query: the fixture is a multi-statement batch.
        tx.execute(sqlx::raw_sql(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            users_seeded: SEED_USER_IDS.len(),
            requests_seeded: SEED_REQUEST_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for user_id in SEED_USER_IDS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")
                    .bind(user_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((*user_id, exists == 1));
        }

        for request_id in SEED_REQUEST_IDS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM requests WHERE id = ?1)")
                    .bind(request_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((*request_id, exists == 1));
        }

        let it_report_chain: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users
                           WHERE id = ?1 AND reporting_manager_id = ?2)",
        )
        .bind(USER_IT_REPORT)
        .bind(USER_IT_MANAGER)
        .fetch_one(pool)
        .await?;
        checks.push(("it-report-chain", it_report_chain == 1));

        let approved_stamps: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM requests
                           WHERE id = 'req-approved'
                             AND approved_by_manager_id IS NOT NULL
                             AND approved_by_it_manager_id IS NOT NULL)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("approved-audit-stamps", approved_stamps == 1));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub users_seeded: usize,
    pub requests_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Minimal org reference data for repository tests: enough rows to satisfy
/// the foreign keys without dragging in the whole seed dataset.
pub async fn insert_org_baseline(pool: &DbPool) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT OR IGNORE INTO companies (id, name, created_at)
         VALUES ('co-main', 'Meridian Group', '2026-01-05T09:00:00+00:00')",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO departments (id, name, company_id, created_at) VALUES
             ('dept-it', 'Information Technology', 'co-main', '2026-01-05T09:00:00+00:00'),
             ('dept-ops', 'Operations', 'co-main', '2026-01-05T09:00:00+00:00')",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO sites (id, name, created_at)
         VALUES ('site-hq', 'Head Office', '2026-01-05T09:00:00+00:00')",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO categories (id, name, description, created_at) VALUES
             ('cat-hardware', 'Hardware', NULL, '2026-01-05T09:00:00+00:00'),
             ('cat-software', 'Software', NULL, '2026-01-05T09:00:00+00:00')",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO subcategories (id, name, description, category_id, created_at) VALUES
             ('sub-peripherals', 'Peripherals', NULL, 'cat-hardware', '2026-01-05T09:00:00+00:00'),
             ('sub-laptop', 'Laptops', NULL, 'cat-hardware', '2026-01-05T09:00:00+00:00'),
             ('sub-licenses', 'Licenses', NULL, 'cat-software', '2026-01-05T09:00:00+00:00')",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// The reporting chains from the seed dataset, without the seed requests.
pub async fn insert_user_baseline(pool: &DbPool) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT OR IGNORE INTO users (id, name, email, password_hash, role, department_id,
                                      company_id, site_id, reporting_manager_id, is_active,
                                      created_at, updated_at) VALUES
             ('u-admin', 'Avery Admin', 'admin@meridian.test', 'seed-hash', 'Admin',
              'dept-it', 'co-main', 'site-hq', NULL, 1,
              '2026-01-05T09:00:00+00:00', '2026-01-05T09:00:00+00:00'),
             ('u-it-manager', 'Imogen Hale', 'it.manager@meridian.test', 'seed-hash', 'IT Manager',
              'dept-it', 'co-main', 'site-hq', NULL, 1,
              '2026-01-05T09:00:00+00:00', '2026-01-05T09:00:00+00:00'),
             ('u-manager', 'Marcus Ferro', 'manager@meridian.test', 'seed-hash', 'Manager',
              'dept-ops', 'co-main', 'site-hq', NULL, 1,
              '2026-01-05T09:00:00+00:00', '2026-01-05T09:00:00+00:00'),
             ('u-employee', 'Elena Ward', 'elena@meridian.test', 'seed-hash', 'User',
              'dept-ops', 'co-main', 'site-hq', 'u-manager', 1,
              '2026-01-05T09:00:00+00:00', '2026-01-05T09:00:00+00:00'),
             ('u-it-report', 'Theo Brandt', 'theo@meridian.test', 'seed-hash', 'User',
              'dept-it', 'co-main', 'site-hq', 'u-it-manager', 1,
              '2026-01-05T09:00:00+00:00', '2026-01-05T09:00:00+00:00'),
             ('u-loner', 'Sam Oduya', 'sam@meridian.test', 'seed-hash', 'User',
              'dept-ops', 'co-main', 'site-hq', NULL, 1,
              '2026-01-05T09:00:00+00:00', '2026-01-05T09:00:00+00:00')",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SeedDataset;
    use crate::{connect_memory, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!SeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn seed_loads_verifies_and_is_idempotent() {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let first = SeedDataset::load(&pool).await.expect("load seed");
        assert_eq!(first.users_seeded, 6);
        assert_eq!(first.requests_seeded, 4);

        let verification = SeedDataset::verify(&pool).await.expect("verify seed");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);

        SeedDataset::load(&pool).await.expect("reload seed");
        let second = SeedDataset::verify(&pool).await.expect("re-verify seed");
        assert!(second.all_present);
        assert_eq!(verification.checks, second.checks);
    }
}
