use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply pending migrations and report how many were applied.
pub async fn run_pending(pool: &DbPool) -> Result<u64, MigrateError> {
    let before = applied_count(pool).await;
    MIGRATOR.run(pool).await?;
    Ok(applied_count(pool).await.saturating_sub(before))
}

/// Rows in `_sqlx_migrations`; zero when the ledger table does not exist yet.
async fn applied_count(pool: &DbPool) -> u64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .map(|count| count.max(0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_TABLES: &[&str] = &[
        "freelancer",
        "account",
        "service",
        "product",
        "settings",
        "quotation",
        "proposal",
        "orders",
        "order_item",
    ];

    async fn table_count(pool: &sqlx::SqlitePool, name: &str) -> i64 {
        sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("check table")
        .get::<i64, _>("count")
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in MANAGED_TABLES {
            assert_eq!(table_count(&pool, table).await, 1, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn run_pending_reports_applied_count_and_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        let applied = run_pending(&pool).await.expect("first run");
        assert_eq!(applied, 1);

        let applied = run_pending(&pool).await.expect("second run");
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        for table in MANAGED_TABLES {
            assert_eq!(table_count(&pool, table).await, 0, "table {table} should be dropped");
        }
    }

    #[tokio::test]
    async fn proposal_pair_uniqueness_is_enforced_by_the_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        sqlx::query("INSERT INTO freelancer (name, email) VALUES ('F', 'f@souk.test')")
            .execute(&pool)
            .await
            .expect("seed freelancer");
        sqlx::query("INSERT INTO service (name) VALUES ('Painting')")
            .execute(&pool)
            .await
            .expect("seed service");
        sqlx::query(
            "INSERT INTO quotation (service_id, first_name, last_name, email, phone, address, city, description, created_at)
             VALUES (1, 'A', 'B', 'a@souk.test', '1', 'addr', 'Tunis', 'd', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("seed quotation");

        let insert = "INSERT INTO proposal (quotation_id, freelancer_id, price, status, created_at)
                      VALUES (1, 1, '0', 'PENDING', '2026-01-01T00:00:00Z')";
        sqlx::query(insert).execute(&pool).await.expect("first proposal");
        let duplicate = sqlx::query(insert).execute(&pool).await;
        assert!(duplicate.is_err(), "duplicate (quotation, freelancer) pair must be rejected");
    }
}
