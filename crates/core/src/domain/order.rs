use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderItemId(pub i64);

/// Simple order lifecycle, independent of the quotation state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "SHIPPED" => Some(Self::Shipped),
            "DELIVERED" => Some(Self::Delivered),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A line of a placed order. Price and name are snapshots taken at order
/// time and are never re-derived from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Decimal,
    pub name: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// A placed retail order. `total_amount` is fixed at creation and never
/// recomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub code: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub payed: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Client-submitted order line. The price is taken as submitted and not
/// re-validated against the catalog's current price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItemDraft {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Decimal,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Client-submitted order payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub items: Vec<OrderItemDraft>,
}

/// Fully priced order ready for the atomic persistence step: header, item
/// snapshots, and the stock decrements all commit as one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderRecord {
    pub code: String,
    pub total_amount: Decimal,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub items: Vec<NewOrderItemRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderItemRecord {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Decimal,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus;

    #[test]
    fn status_encoding_round_trips() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("REFUNDED"), None);
    }
}
