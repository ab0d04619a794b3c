use sqlx::Row;
use tracing::warn;

use souk_core::domain::actor::{AccountId, Actor, IdentityProvider, Role};
use souk_core::domain::freelancer::FreelancerId;
use souk_core::errors::EngineError;

use crate::DbPool;

/// Resolves bearer tokens against the account table. Unknown tokens resolve
/// to `None`; the caller decides whether the operation admits guests.
pub struct SqlIdentityProvider {
    pool: DbPool,
}

impl SqlIdentityProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SqlIdentityProvider {
    async fn resolve(&self, credential: &str) -> Result<Option<Actor>, EngineError> {
        let row = sqlx::query(
            "SELECT id, email, role, freelancer_id FROM account WHERE api_token = ?",
        )
        .bind(credential)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| EngineError::Internal(error.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let account_id: i64 =
            row.try_get("id").map_err(|error| EngineError::Internal(error.to_string()))?;
        let email: String =
            row.try_get("email").map_err(|error| EngineError::Internal(error.to_string()))?;
        let role_raw: String =
            row.try_get("role").map_err(|error| EngineError::Internal(error.to_string()))?;
        let freelancer_id: Option<i64> = row
            .try_get("freelancer_id")
            .map_err(|error| EngineError::Internal(error.to_string()))?;

        let Some(role) = Role::parse(&role_raw) else {
            warn!(event_name = "identity.unknown_role", account_id, role = %role_raw);
            return Ok(None);
        };

        Ok(Some(Actor {
            account_id: Some(AccountId(account_id)),
            email: Some(email),
            role,
            freelancer_id: freelancer_id.map(FreelancerId),
        }))
    }
}
