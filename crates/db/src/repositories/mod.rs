use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use souk_core::domain::freelancer::{Freelancer, FreelancerId};
use souk_core::domain::order::{NewOrderRecord, Order, OrderId, OrderStatus};
use souk_core::domain::product::{Product, ProductId, Service, ServiceId};
use souk_core::domain::proposal::{Proposal, ProposalId};
use souk_core::domain::quotation::{NewQuotation, Quotation, QuotationId};
use souk_core::domain::settings::SettingsSnapshot;
use souk_core::visibility::{OrderScope, QuotationScope};

pub mod catalog;
pub mod identity;
pub mod memory;
pub mod order;
pub mod quotation;
pub mod settings;

pub use catalog::SqlCatalogRepository;
pub use identity::SqlIdentityProvider;
pub use memory::{
    InMemoryCatalog, InMemoryOrderRepository, InMemoryQuotationRepository, StaticIdentityProvider,
};
pub use order::SqlOrderRepository;
pub use quotation::SqlQuotationRepository;
pub use settings::SqlSettingsRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// A conditional update lost: the row was no longer in the expected
    /// state when the write executed.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The conditional stock decrement affected zero rows.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(i64),
}

impl From<RepositoryError> for souk_core::errors::EngineError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::InsufficientStock(product_id) => {
                Self::InsufficientStock { product_id }
            }
            // Storage detail stays in the logs; callers get a generic error.
            RepositoryError::Database(inner) => Self::Internal(inner.to_string()),
            RepositoryError::Decode(message) => Self::Internal(message),
        }
    }
}

#[async_trait]
pub trait QuotationRepository: Send + Sync {
    async fn insert(&self, quotation: NewQuotation) -> Result<Quotation, RepositoryError>;
    async fn find_by_id(&self, id: QuotationId) -> Result<Option<Quotation>, RepositoryError>;
    async fn list(&self, scope: &QuotationScope) -> Result<Vec<Quotation>, RepositoryError>;
    async fn proposals_for(&self, id: QuotationId) -> Result<Vec<Proposal>, RepositoryError>;
    async fn find_proposal(
        &self,
        quotation_id: QuotationId,
        freelancer_id: FreelancerId,
    ) -> Result<Option<Proposal>, RepositoryError>;
    async fn find_proposal_by_id(
        &self,
        id: ProposalId,
    ) -> Result<Option<Proposal>, RepositoryError>;

    /// Create a pending invitation proposal (price 0) and move a still-pending
    /// quotation to OPEN, as one transaction.
    async fn create_invitation(
        &self,
        quotation_id: QuotationId,
        freelancer_id: FreelancerId,
        message: &str,
    ) -> Result<Proposal, RepositoryError>;

    /// Record a freelancer's bid on an existing invitation.
    async fn record_bid(
        &self,
        id: ProposalId,
        price: Decimal,
        message: Option<String>,
    ) -> Result<Proposal, RepositoryError>;

    /// Accept a proposal: mark it ACCEPTED, select it on the quotation, and
    /// move the quotation to ASSIGNED. The quotation update is a conditional
    /// compare-and-swap on status PENDING/OPEN; a losing concurrent accept
    /// gets `Conflict` and nothing is written.
    async fn accept_proposal(
        &self,
        quotation_id: QuotationId,
        proposal_id: ProposalId,
    ) -> Result<(), RepositoryError>;

    async fn save(&self, quotation: &Quotation) -> Result<(), RepositoryError>;

    /// Delete the quotation and all of its proposals, as one transaction.
    async fn delete(&self, id: QuotationId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order header, its item snapshots, and the per-product
    /// conditional stock decrements as a single transaction. Any decrement
    /// that would drive stock negative aborts the whole order with
    /// `InsufficientStock` and no partial writes.
    async fn create(&self, record: NewOrderRecord) -> Result<Order, RepositoryError>;
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn list(
        &self,
        scope: &OrderScope,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError>;
    async fn update_status(&self, id: OrderId, status: OrderStatus)
        -> Result<bool, RepositoryError>;
    /// Delete the order and its items, as one transaction.
    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError>;
}

#[async_trait]
pub trait FreelancerRepository: Send + Sync {
    async fn find_by_id(&self, id: FreelancerId) -> Result<Option<Freelancer>, RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// The active shipping/tax settings snapshot. Falls back to zeroed
    /// defaults when the settings row has not been provisioned.
    async fn current(&self) -> Result<SettingsSnapshot, RepositoryError>;
}

pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|_| {
        RepositoryError::Decode(format!("invalid decimal `{raw}` in column `{column}`"))
    })
}

pub(crate) fn datetime_column(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| {
            RepositoryError::Decode(format!("invalid timestamp `{raw}` in column `{column}`"))
        })
}
