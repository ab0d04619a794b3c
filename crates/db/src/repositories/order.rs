use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use souk_core::domain::order::{
    NewOrderRecord, Order, OrderId, OrderItem, OrderItemId, OrderStatus,
};
use souk_core::domain::product::ProductId;
use souk_core::visibility::OrderScope;

use super::{datetime_column, decimal_column, OrderRepository, RepositoryError};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, code, total_amount, status, customer_name, email, phone,
     shipping_address, payment_method, payed, created_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price, name, color, size";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id = ? ORDER BY id ASC"
        ))
        .bind(order_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(item_from_row).collect()
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, record: NewOrderRecord) -> Result<Order, RepositoryError> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let header = sqlx::query(
            "INSERT INTO orders (
                code, total_amount, status, customer_name, email, phone,
                shipping_address, payment_method, payed, created_at
             ) VALUES (?, ?, 'PENDING', ?, ?, ?, ?, ?, 'check', ?)",
        )
        .bind(&record.code)
        .bind(record.total_amount.to_string())
        .bind(&record.customer_name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.shipping_address)
        .bind(&record.payment_method)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        let order_id = OrderId(header.last_insert_rowid());

        let mut items = Vec::with_capacity(record.items.len());
        for item in &record.items {
            // The decrement is conditional on remaining stock. Zero rows
            // means the product cannot cover the quantity; the transaction
            // rolls back on drop and nothing is written.
            let decrement = sqlx::query(
                "UPDATE product SET stock_quantity = stock_quantity - ?
                 WHERE id = ? AND stock_quantity >= ?",
            )
            .bind(item.quantity)
            .bind(item.product_id.0)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if decrement.rows_affected() == 0 {
                return Err(RepositoryError::InsufficientStock(item.product_id.0));
            }

            let inserted = sqlx::query(
                "INSERT INTO order_item (order_id, product_id, quantity, price, name, color, size)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(order_id.0)
            .bind(item.product_id.0)
            .bind(item.quantity)
            .bind(item.price.to_string())
            .bind(&item.name)
            .bind(item.color.as_deref())
            .bind(item.size.as_deref())
            .execute(&mut *tx)
            .await?;

            items.push(OrderItem {
                id: OrderItemId(inserted.last_insert_rowid()),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                name: Some(item.name.clone()),
                color: item.color.clone(),
                size: item.size.clone(),
            });
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            code: record.code,
            total_amount: record.total_amount,
            status: OrderStatus::Pending,
            customer_name: record.customer_name,
            email: record.email,
            phone: record.phone,
            shipping_address: record.shipping_address,
            payment_method: record.payment_method,
            payed: "check".to_string(),
            created_at,
            items,
        })
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = order_from_row(row)?;
        order.items = self.items_for(order.id).await?;
        Ok(Some(order))
    }

    async fn list(
        &self,
        scope: &OrderScope,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = match scope {
            OrderScope::All => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            OrderScope::Email(email) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE email = ? COLLATE NOCASE
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(email)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let mut order = order_from_row(row)?;
            order.items = self.items_for(order.id).await?;
            orders.push(order);
        }
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_item WHERE order_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = ?").bind(id.0).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

fn order_from_row(row: SqliteRow) -> Result<Order, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_raw}`")))?;

    Ok(Order {
        id: OrderId(row.try_get("id")?),
        code: row.try_get("code")?,
        total_amount: decimal_column(&row, "total_amount")?,
        status,
        customer_name: row.try_get("customer_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        shipping_address: row.try_get("shipping_address")?,
        payment_method: row.try_get("payment_method")?,
        payed: row.try_get("payed")?,
        created_at: datetime_column(&row, "created_at")?,
        items: Vec::new(),
    })
}

fn item_from_row(row: SqliteRow) -> Result<OrderItem, RepositoryError> {
    Ok(OrderItem {
        id: OrderItemId(row.try_get("id")?),
        order_id: OrderId(row.try_get("order_id")?),
        product_id: ProductId(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        price: decimal_column(&row, "price")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        size: row.try_get("size")?,
    })
}
