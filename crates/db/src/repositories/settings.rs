use souk_core::domain::settings::SettingsSnapshot;

use super::{decimal_column, RepositoryError, SettingsRepository};
use crate::DbPool;

pub struct SqlSettingsRepository {
    pool: DbPool,
}

impl SqlSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SettingsRepository for SqlSettingsRepository {
    async fn current(&self) -> Result<SettingsSnapshot, RepositoryError> {
        let row = sqlx::query(
            "SELECT shipping_cost, free_shipping_threshold, tax_rate FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(SettingsSnapshot::default());
        };

        Ok(SettingsSnapshot {
            shipping_cost: decimal_column(&row, "shipping_cost")?,
            free_shipping_threshold: decimal_column(&row, "free_shipping_threshold")?,
            tax_rate: decimal_column(&row, "tax_rate")?,
        })
    }
}
