use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use ticketry_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

const CONNECTION_PRAGMAS: &[&str] =
    &["PRAGMA foreign_keys = ON", "PRAGMA journal_mode = WAL", "PRAGMA busy_timeout = 5000"];

/// Opens a pool sized by the `[database]` config section. SQLite enforces
/// neither foreign keys nor a busy timeout unless asked, so every
/// connection gets the pragmas on checkout.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                for pragma in CONNECTION_PRAGMAS {
                    sqlx::query(pragma).execute(&mut *conn).await?;
                }
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}

/// Single-connection pool over a private in-memory database. With
/// `sqlite::memory:` each connection opens its own database, so the pool
/// must never grow past one connection.
pub async fn connect_memory() -> Result<DbPool, sqlx::Error> {
    connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        timeout_secs: 30,
    })
    .await
}
