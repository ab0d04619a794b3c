use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_ACCOUNT_TOKENS: &[(&str, &str)] = &[
    ("admin-token", "admin"),
    ("client-token", "client"),
    ("freelancer-token", "freelancer"),
];

const SEED_FREELANCER_COUNT: i64 = 2;
const SEED_SERVICE_COUNT: i64 = 2;
const SEED_PRODUCT_COUNT: i64 = 3;

/// Deterministic development/E2E dataset: settings, a small catalog, and one
/// account per role with a fixed bearer token.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the dataset in a single transaction.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            accounts: SEED_ACCOUNT_TOKENS.len(),
            freelancers: SEED_FREELANCER_COUNT as usize,
            services: SEED_SERVICE_COUNT as usize,
            products: SEED_PRODUCT_COUNT as usize,
        })
    }

    /// Verify that the seeded rows exist and match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (token, role) in SEED_ACCOUNT_TOKENS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM account WHERE api_token = ?1 AND role = ?2)",
            )
            .bind(token)
            .bind(role)
            .fetch_one(pool)
            .await?;
            checks.push((*token, exists == 1));
        }

        let settings_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE id = 1)")
                .fetch_one(pool)
                .await?;
        checks.push(("settings-row", settings_exists == 1));

        let freelancers: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM freelancer").fetch_one(pool).await?;
        checks.push(("freelancers", freelancers >= SEED_FREELANCER_COUNT));

        let services: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM service").fetch_one(pool).await?;
        checks.push(("services", services >= SEED_SERVICE_COUNT));

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM product").fetch_one(pool).await?;
        checks.push(("products", products >= SEED_PRODUCT_COUNT));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub accounts: usize,
    pub freelancers: usize,
    pub services: usize,
    pub products: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use crate::connection::connect_with_settings;
    use crate::migrations::run_pending;

    use super::SeedDataset;

    #[tokio::test]
    async fn seed_dataset_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let result = SeedDataset::load(&pool).await.expect("load seeds");
        assert_eq!(result.accounts, 3);

        let verification = SeedDataset::verify(&pool).await.expect("verify seeds");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);
    }

    #[tokio::test]
    async fn seed_dataset_reloads_over_existing_rows() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        SeedDataset::load(&pool).await.expect("first load");
        SeedDataset::load(&pool).await.expect("second load over existing rows");

        let verification = SeedDataset::verify(&pool).await.expect("verify seeds");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);

        let freelancers: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM freelancer").fetch_one(&pool).await.expect("count");
        assert_eq!(freelancers, 2, "reload must not duplicate rows");
        let accounts: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM account").fetch_one(&pool).await.expect("count");
        assert_eq!(accounts, 3, "reload must not duplicate rows");
    }
}
