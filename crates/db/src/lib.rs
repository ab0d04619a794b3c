pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{SeedDataset, SeedResult, VerificationResult};
pub use repositories::{
    FreelancerRepository, InMemoryCatalog, InMemoryOrderRepository, InMemoryQuotationRepository,
    OrderRepository, ProductRepository, QuotationRepository, RepositoryError, ServiceRepository,
    SettingsRepository, SqlCatalogRepository, SqlIdentityProvider, SqlOrderRepository,
    SqlQuotationRepository, SqlSettingsRepository, StaticIdentityProvider,
};
