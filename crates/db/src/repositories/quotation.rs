use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use souk_core::domain::actor::AccountId;
use souk_core::domain::freelancer::FreelancerId;
use souk_core::domain::product::ServiceId;
use souk_core::domain::proposal::{Proposal, ProposalId, ProposalStatus};
use souk_core::domain::quotation::{
    NewQuotation, Quotation, QuotationContact, QuotationId, QuotationStatus,
};
use souk_core::visibility::QuotationScope;

use super::{datetime_column, decimal_column, QuotationRepository, RepositoryError};
use crate::DbPool;

const QUOTATION_COLUMNS: &str = "id, service_id, user_id, first_name, last_name, email, phone,
     address, city, postal_code, description, preferred_timeline, status,
     selected_proposal_id, created_at";

const PROPOSAL_COLUMNS: &str =
    "id, quotation_id, freelancer_id, price, message, status, created_at";

pub struct SqlQuotationRepository {
    pool: DbPool,
}

impl SqlQuotationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuotationRepository for SqlQuotationRepository {
    async fn insert(&self, quotation: NewQuotation) -> Result<Quotation, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO quotation (
                service_id, user_id, first_name, last_name, email, phone,
                address, city, postal_code, description, preferred_timeline,
                status, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?)",
        )
        .bind(quotation.service_id.0)
        .bind(quotation.requester.map(|id| id.0))
        .bind(&quotation.contact.first_name)
        .bind(&quotation.contact.last_name)
        .bind(&quotation.contact.email)
        .bind(&quotation.contact.phone)
        .bind(&quotation.contact.address)
        .bind(&quotation.contact.city)
        .bind(quotation.contact.postal_code.as_deref())
        .bind(&quotation.description)
        .bind(quotation.preferred_timeline.as_deref())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Quotation {
            id: QuotationId(result.last_insert_rowid()),
            service_id: quotation.service_id,
            user_id: quotation.requester,
            contact: quotation.contact,
            description: quotation.description,
            preferred_timeline: quotation.preferred_timeline,
            status: QuotationStatus::Pending,
            selected_proposal_id: None,
            created_at,
        })
    }

    async fn find_by_id(&self, id: QuotationId) -> Result<Option<Quotation>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotation WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(quotation_from_row).transpose()
    }

    async fn list(&self, scope: &QuotationScope) -> Result<Vec<Quotation>, RepositoryError> {
        let rows = match scope {
            QuotationScope::All => {
                sqlx::query(&format!(
                    "SELECT {QUOTATION_COLUMNS} FROM quotation ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            QuotationScope::InvitedFreelancer(freelancer_id) => {
                sqlx::query(
                    "SELECT q.id, q.service_id, q.user_id, q.first_name, q.last_name,
                            q.email, q.phone, q.address, q.city, q.postal_code,
                            q.description, q.preferred_timeline, q.status,
                            q.selected_proposal_id, q.created_at
                     FROM quotation q
                     JOIN proposal p ON p.quotation_id = q.id
                     WHERE p.freelancer_id = ?
                     ORDER BY q.created_at DESC",
                )
                .bind(freelancer_id.0)
                .fetch_all(&self.pool)
                .await?
            }
            QuotationScope::Requester { account_id, email } => {
                sqlx::query(&format!(
                    "SELECT {QUOTATION_COLUMNS} FROM quotation
                     WHERE (user_id IS NOT NULL AND user_id = ?) OR email = ?
                     ORDER BY created_at DESC"
                ))
                .bind(account_id.unwrap_or(-1))
                .bind(email.as_deref().unwrap_or(""))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(quotation_from_row).collect()
    }

    async fn proposals_for(&self, id: QuotationId) -> Result<Vec<Proposal>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposal WHERE quotation_id = ? ORDER BY created_at ASC"
        ))
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(proposal_from_row).collect()
    }

    async fn find_proposal(
        &self,
        quotation_id: QuotationId,
        freelancer_id: FreelancerId,
    ) -> Result<Option<Proposal>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposal WHERE quotation_id = ? AND freelancer_id = ?"
        ))
        .bind(quotation_id.0)
        .bind(freelancer_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(proposal_from_row).transpose()
    }

    async fn find_proposal_by_id(
        &self,
        id: ProposalId,
    ) -> Result<Option<Proposal>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PROPOSAL_COLUMNS} FROM proposal WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(proposal_from_row).transpose()
    }

    async fn create_invitation(
        &self,
        quotation_id: QuotationId,
        freelancer_id: FreelancerId,
        message: &str,
    ) -> Result<Proposal, RepositoryError> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO proposal (quotation_id, freelancer_id, price, message, status, created_at)
             VALUES (?, ?, '0', ?, 'PENDING', ?)",
        )
        .bind(quotation_id.0)
        .bind(freelancer_id.0)
        .bind(message)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|error| match error {
            // The unique (quotation, freelancer) index rejected a duplicate
            // invitation that raced past the engine's existence check.
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict("freelancer already invited".to_string())
            }
            other => RepositoryError::Database(other),
        })?;

        // Inviting opens a still-pending quotation; later statuses are left
        // untouched so the lifecycle never moves backwards.
        sqlx::query("UPDATE quotation SET status = 'OPEN' WHERE id = ? AND status = 'PENDING'")
            .bind(quotation_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Proposal {
            id: ProposalId(result.last_insert_rowid()),
            quotation_id,
            freelancer_id,
            price: Decimal::ZERO,
            message: Some(message.to_string()),
            status: ProposalStatus::Pending,
            created_at,
        })
    }

    async fn record_bid(
        &self,
        id: ProposalId,
        price: Decimal,
        message: Option<String>,
    ) -> Result<Proposal, RepositoryError> {
        let result = sqlx::query(
            "UPDATE proposal SET price = ?, message = ?, status = 'SUBMITTED' WHERE id = ?",
        )
        .bind(price.to_string())
        .bind(message.as_deref())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "proposal {} vanished before the bid was recorded",
                id.0
            )));
        }

        self.find_proposal_by_id(id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("proposal {} missing after bid update", id.0))
        })
    }

    async fn accept_proposal(
        &self,
        quotation_id: QuotationId,
        proposal_id: ProposalId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap: only a quotation still accepting proposals can be
        // assigned. A losing concurrent accept affects zero rows and the
        // transaction rolls back on drop.
        let quotation_update = sqlx::query(
            "UPDATE quotation SET selected_proposal_id = ?, status = 'ASSIGNED'
             WHERE id = ? AND status IN ('PENDING', 'OPEN')",
        )
        .bind(proposal_id.0)
        .bind(quotation_id.0)
        .execute(&mut *tx)
        .await?;

        if quotation_update.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "quotation is no longer accepting proposals".to_string(),
            ));
        }

        let proposal_update = sqlx::query(
            "UPDATE proposal SET status = 'ACCEPTED' WHERE id = ? AND quotation_id = ?",
        )
        .bind(proposal_id.0)
        .bind(quotation_id.0)
        .execute(&mut *tx)
        .await?;

        if proposal_update.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "proposal no longer belongs to this quotation".to_string(),
            ));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save(&self, quotation: &Quotation) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE quotation SET
                service_id = ?, user_id = ?, first_name = ?, last_name = ?,
                email = ?, phone = ?, address = ?, city = ?, postal_code = ?,
                description = ?, preferred_timeline = ?, status = ?,
                selected_proposal_id = ?
             WHERE id = ?",
        )
        .bind(quotation.service_id.0)
        .bind(quotation.user_id.map(|id| id.0))
        .bind(&quotation.contact.first_name)
        .bind(&quotation.contact.last_name)
        .bind(&quotation.contact.email)
        .bind(&quotation.contact.phone)
        .bind(&quotation.contact.address)
        .bind(&quotation.contact.city)
        .bind(quotation.contact.postal_code.as_deref())
        .bind(&quotation.description)
        .bind(quotation.preferred_timeline.as_deref())
        .bind(quotation.status.as_str())
        .bind(quotation.selected_proposal_id.map(|id| id.0))
        .bind(quotation.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: QuotationId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM proposal WHERE quotation_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM quotation WHERE id = ?").bind(id.0).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

fn quotation_from_row(row: SqliteRow) -> Result<Quotation, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = QuotationStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown quotation status `{status_raw}`"))
    })?;

    Ok(Quotation {
        id: QuotationId(row.try_get("id")?),
        service_id: ServiceId(row.try_get("service_id")?),
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(AccountId),
        contact: QuotationContact {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            postal_code: row.try_get("postal_code")?,
        },
        description: row.try_get("description")?,
        preferred_timeline: row.try_get("preferred_timeline")?,
        status,
        selected_proposal_id: row
            .try_get::<Option<i64>, _>("selected_proposal_id")?
            .map(ProposalId),
        created_at: datetime_column(&row, "created_at")?,
    })
}

fn proposal_from_row(row: SqliteRow) -> Result<Proposal, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = ProposalStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown proposal status `{status_raw}`"))
    })?;

    Ok(Proposal {
        id: ProposalId(row.try_get("id")?),
        quotation_id: QuotationId(row.try_get("quotation_id")?),
        freelancer_id: FreelancerId(row.try_get("freelancer_id")?),
        price: decimal_column(&row, "price")?,
        message: row.try_get("message")?,
        status,
        created_at: datetime_column(&row, "created_at")?,
    })
}
