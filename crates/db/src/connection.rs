use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use souk_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Open a pool per the `[database]` section of the app config.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

/// Open a pool with explicit settings, mostly for tests against
/// `sqlite::memory:`.
///
/// Every connection enforces foreign keys. The sqlite busy handler gets the
/// same patience as the pool's acquire timeout, so a write waiting on a lock
/// fails no earlier than a caller waiting on a connection. WAL is skipped
/// for in-memory databases, where there is no journal file to share.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let timeout_secs = timeout_secs.clamp(1, 300);
    let busy_timeout_ms = timeout_secs * 1000;
    let journaled = !database_url.contains(":memory:");

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                if journaled {
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                }
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
