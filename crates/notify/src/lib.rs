//! Order confirmation notifications. Dispatch happens after the order
//! transaction has committed; a failed dispatch never fails the order.

use std::sync::Mutex;

use tera::{Context, Tera};
use thiserror::Error;
use tracing::info;

use souk_core::domain::order::Order;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("template error: {0}")]
    Template(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A rendered notification ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError>;
}

const ORDER_CONFIRMATION_TEMPLATE: &str = "order_confirmation.txt";

fn templates() -> Result<Tera, DispatchError> {
    let mut tera = Tera::default();
    tera.add_raw_template(
        ORDER_CONFIRMATION_TEMPLATE,
        include_str!("../../../templates/order_confirmation.txt"),
    )
    .map_err(|error| DispatchError::Template(error.to_string()))?;
    Ok(tera)
}

/// Render the confirmation sent to the customer after an order commits.
pub fn order_confirmation(order: &Order) -> Result<Notification, DispatchError> {
    let mut context = Context::new();
    context.insert("customer_name", &order.customer_name);
    context.insert("code", &order.code);
    context.insert("total_amount", &order.total_amount.to_string());
    context.insert("phone", &order.phone);
    context.insert("shipping_address", &order.shipping_address);

    let items: Vec<tera::Value> = order
        .items
        .iter()
        .map(|item| {
            let mut entry = tera::Map::new();
            entry.insert("quantity".to_string(), item.quantity.into());
            entry.insert(
                "name".to_string(),
                item.name.clone().unwrap_or_else(|| "item".to_string()).into(),
            );
            entry.insert("price".to_string(), item.price.to_string().into());
            tera::Value::Object(entry)
        })
        .collect();
    context.insert("items", &items);

    let body = templates()?
        .render(ORDER_CONFIRMATION_TEMPLATE, &context)
        .map_err(|error| DispatchError::Template(error.to_string()))?;

    Ok(Notification {
        recipient: order.email.clone(),
        subject: format!("Order confirmation {}", order.code),
        body,
    })
}

/// Dispatcher that writes the notification to the log. Stands in for a real
/// mail transport in development.
#[derive(Default)]
pub struct LogDispatcher;

#[async_trait::async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        info!(
            event_name = "notify.dispatched",
            recipient = %notification.recipient,
            subject = %notification.subject,
        );
        Ok(())
    }
}

/// Test double that records dispatched notifications and can be told to fail.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: true }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Delivery("recording dispatcher set to fail".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification);
        }
        Ok(())
    }
}
