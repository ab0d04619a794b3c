use sqlx::Row;

use souk_core::domain::freelancer::{Freelancer, FreelancerId};
use souk_core::domain::product::{Product, ProductId, Service, ServiceId};

use super::{
    decimal_column, FreelancerRepository, ProductRepository, RepositoryError, ServiceRepository,
};
use crate::DbPool;

/// Read-only access to the catalog tables. Stock writes happen inside the
/// order transaction, not here.
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlCatalogRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, price, stock_quantity FROM product WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Product {
                id: ProductId(row.try_get("id")?),
                name: row.try_get("name")?,
                price: decimal_column(&row, "price")?,
                stock_quantity: row.try_get("stock_quantity")?,
            })
        })
        .transpose()
    }
}

#[async_trait::async_trait]
impl ServiceRepository for SqlCatalogRepository {
    async fn find_by_id(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM service WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Service { id: ServiceId(row.try_get("id")?), name: row.try_get("name")? })
        })
        .transpose()
    }
}

#[async_trait::async_trait]
impl FreelancerRepository for SqlCatalogRepository {
    async fn find_by_id(&self, id: FreelancerId) -> Result<Option<Freelancer>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, email FROM freelancer WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Freelancer {
                id: FreelancerId(row.try_get("id")?),
                name: row.try_get("name")?,
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }
}
