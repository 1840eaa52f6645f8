use std::collections::HashSet;

use sqlx::migrate::{Migrate, MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies whatever the `_sqlx_migrations` ledger does not yet record and
/// reports the versions this call applied, newest last.
pub async fn run_pending(pool: &DbPool) -> Result<Vec<String>, MigrateError> {
    let mut conn = pool.acquire().await?;
    conn.ensure_migrations_table().await?;
    let already_applied: HashSet<i64> =
        conn.list_applied_migrations().await?.into_iter().map(|m| m.version).collect();
    drop(conn);

    MIGRATOR.run(pool).await?;

    Ok(MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration() && !already_applied.contains(&m.version))
        .map(|m| format!("{:04}_{}", m.version, m.description))
        .collect())
}
