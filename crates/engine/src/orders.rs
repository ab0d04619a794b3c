//! Inventory-backed order transaction engine: atomic order creation with
//! conditional stock decrements, scoped reads, and display-time pricing.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use souk_core::domain::actor::Actor;
use souk_core::domain::order::{
    NewOrderItemRecord, NewOrderRecord, Order, OrderDraft, OrderId, OrderStatus,
};
use souk_core::errors::EngineError;
use souk_core::order_code;
use souk_core::policy::Policy;
use souk_core::pricing::{self, PricingBreakdown};
use souk_core::visibility::{can_view_order, order_scope};
use souk_db::repositories::{OrderRepository, ProductRepository, SettingsRepository};
use souk_notify::{order_confirmation, NotificationDispatcher};

/// An order with its display-time pricing breakdown, recomputed from the
/// settings snapshot current at read time. The stored `total_amount` stays
/// fixed and can diverge from this breakdown if settings changed since the
/// order was placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub pricing: PricingBreakdown,
}

pub struct OrderEngine {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    settings: Arc<dyn SettingsRepository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    delete_policy: Policy,
}

impl OrderEngine {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        settings: Arc<dyn SettingsRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self { orders, products, settings, dispatcher, delete_policy: Policy::admin_only() }
    }

    /// Place an order. Open to guests. Validation and pricing happen before
    /// any write; the header, item snapshots, and conditional stock
    /// decrements commit as one transaction. The confirmation notification
    /// goes out on a detached task only after the commit.
    pub async fn create_order(&self, draft: OrderDraft) -> Result<Order, EngineError> {
        if draft.items.is_empty() {
            return Err(EngineError::validation("order must contain at least one item"));
        }
        for item in &draft.items {
            if item.quantity <= 0 {
                return Err(EngineError::validation("item quantity must be positive"));
            }
        }

        let mut items = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let product = self
                .products
                .find_by_id(item.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("product", item.product_id.0))?;
            items.push(NewOrderItemRecord {
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                name: product.name,
                color: item.color.clone(),
                size: item.size.clone(),
            });
        }

        let settings = self.settings.current().await?;
        let pricing = pricing::price_order(&draft.items, &settings);
        let code = order_code::generate();

        let order = self
            .orders
            .create(NewOrderRecord {
                code,
                total_amount: pricing.total,
                customer_name: draft.customer_name,
                email: draft.email,
                phone: draft.phone,
                shipping_address: draft.shipping_address,
                payment_method: draft.payment_method,
                items,
            })
            .await?;

        info!(
            event_name = "order.created",
            order_id = order.id.0,
            code = %order.code,
            total = %order.total_amount,
            items = order.items.len(),
        );

        // Post-commit, off the critical path. A dispatch failure never
        // surfaces to the caller.
        let dispatcher = Arc::clone(&self.dispatcher);
        let committed = order.clone();
        tokio::spawn(async move {
            match order_confirmation(&committed) {
                Ok(notification) => {
                    if let Err(error) = dispatcher.dispatch(notification).await {
                        warn!(
                            event_name = "notify.failed",
                            order_id = committed.id.0,
                            error = %error,
                        );
                    }
                }
                Err(error) => {
                    warn!(
                        event_name = "notify.render_failed",
                        order_id = committed.id.0,
                        error = %error,
                    );
                }
            }
        });

        Ok(order)
    }

    /// Read one order with a breakdown recomputed from current settings.
    /// Missing item names are back-filled from the product catalog.
    pub async fn order_detail(
        &self,
        actor: &Actor,
        id: OrderId,
    ) -> Result<OrderDetail, EngineError> {
        let mut order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("order", id.0))?;

        if !can_view_order(actor, &order) {
            return Err(EngineError::forbidden("you do not have permission to view this order"));
        }

        for item in &mut order.items {
            if item.name.is_none() {
                item.name = self
                    .products
                    .find_by_id(item.product_id)
                    .await?
                    .map(|product| product.name);
            }
        }

        let settings = self.settings.current().await?;
        let subtotal = order
            .items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum::<Decimal>();
        let pricing = pricing::breakdown_for(subtotal, &settings);

        Ok(OrderDetail { order, pricing })
    }

    /// List orders visible to the actor, newest first.
    pub async fn list_orders(
        &self,
        actor: &Actor,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Order>, EngineError> {
        let scope = order_scope(actor);
        Ok(self.orders.list(&scope, offset, limit).await?)
    }

    /// Change an order's status. Restricted to admins or the order's own
    /// email-matched actor.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), EngineError> {
        let order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("order", id.0))?;

        if !can_view_order(actor, &order) {
            return Err(EngineError::forbidden(
                "you do not have permission to update this order",
            ));
        }

        let updated = self.orders.update_status(id, status).await?;
        if !updated {
            return Err(EngineError::not_found("order", id.0));
        }
        info!(event_name = "order.status_updated", order_id = id.0, status = status.as_str());
        Ok(())
    }

    /// Delete an order and its items.
    pub async fn delete_order(&self, actor: &Actor, id: OrderId) -> Result<(), EngineError> {
        self.delete_policy.authorize(actor)?;

        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("order", id.0))?;

        self.orders.delete(id).await?;
        info!(event_name = "order.deleted", order_id = id.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use souk_core::domain::actor::{AccountId, Actor};
    use souk_core::domain::order::{OrderDraft, OrderItemDraft, OrderStatus};
    use souk_core::domain::product::{Product, ProductId};
    use souk_core::domain::settings::SettingsSnapshot;
    use souk_core::errors::EngineError;
    use souk_db::repositories::{InMemoryCatalog, InMemoryOrderRepository};
    use souk_notify::RecordingDispatcher;

    use super::OrderEngine;

    fn admin() -> Actor {
        Actor::admin(AccountId(1), "admin@souk.test")
    }

    fn buyer() -> Actor {
        Actor::client(AccountId(2), "mouna@souk.test")
    }

    fn draft(items: Vec<OrderItemDraft>) -> OrderDraft {
        OrderDraft {
            customer_name: "Mouna Jaziri".to_string(),
            email: "mouna@souk.test".to_string(),
            phone: "+216 22 333 444".to_string(),
            shipping_address: "7 rue Ibn Khaldoun, Sousse".to_string(),
            payment_method: "cash_on_delivery".to_string(),
            items,
        }
    }

    fn line(product_id: i64, quantity: i64, price: Decimal) -> OrderItemDraft {
        OrderItemDraft { product_id: ProductId(product_id), quantity, price, color: None, size: None }
    }

    async fn fixture(
        dispatcher: Arc<RecordingDispatcher>,
    ) -> (OrderEngine, Arc<InMemoryCatalog>) {
        let catalog = Arc::new(InMemoryCatalog::default());
        catalog
            .put_product(Product {
                id: ProductId(1),
                name: "Ceramic table lamp".to_string(),
                price: Decimal::new(5000, 2),
                stock_quantity: 25,
            })
            .await;
        catalog
            .put_product(Product {
                id: ProductId(2),
                name: "Handwoven wool rug".to_string(),
                price: Decimal::new(12000, 2),
                stock_quantity: 2,
            })
            .await;
        catalog
            .set_settings(SettingsSnapshot {
                shipping_cost: Decimal::new(800, 2),
                free_shipping_threshold: Decimal::from(100),
                tax_rate: Decimal::from(10),
            })
            .await;

        let orders = Arc::new(InMemoryOrderRepository::new(Arc::clone(&catalog)));
        let engine = OrderEngine::new(
            orders,
            Arc::clone(&catalog) as Arc<dyn souk_db::repositories::ProductRepository>,
            Arc::clone(&catalog) as Arc<dyn souk_db::repositories::SettingsRepository>,
            dispatcher,
        );
        (engine, catalog)
    }

    #[tokio::test]
    async fn order_at_threshold_ships_free_and_totals_110() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, catalog) = fixture(Arc::clone(&dispatcher)).await;

        let order = engine
            .create_order(draft(vec![line(1, 2, Decimal::new(5000, 2))]))
            .await
            .expect("create order");

        assert_eq!(order.total_amount, Decimal::from(110));
        assert_eq!(order.items[0].name.as_deref(), Some("Ceramic table lamp"));
        assert_eq!(catalog.stock_of(ProductId(1)).await, Some(23));

        let groups: Vec<&str> = order.code.split('-').collect();
        assert_eq!(groups.len(), 4);

        // The confirmation goes out on a detached task after the commit.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "mouna@souk.test");
        assert!(sent[0].body.contains(&order.code));
    }

    #[tokio::test]
    async fn empty_items_fail_validation_before_any_write() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, _) = fixture(dispatcher).await;

        let result = engine.create_order(draft(Vec::new())).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn non_positive_quantity_fails_validation() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, catalog) = fixture(dispatcher).await;

        let result = engine
            .create_order(draft(vec![line(1, 0, Decimal::new(5000, 2))]))
            .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(catalog.stock_of(ProductId(1)).await, Some(25));
    }

    #[tokio::test]
    async fn unknown_product_fails_not_found() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, _) = fixture(dispatcher).await;

        let result = engine
            .create_order(draft(vec![line(99, 1, Decimal::new(5000, 2))]))
            .await;
        assert!(matches!(result, Err(EngineError::NotFound { entity: "product", .. })));
    }

    #[tokio::test]
    async fn insufficient_stock_aborts_the_whole_order() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, catalog) = fixture(Arc::clone(&dispatcher)).await;

        let result = engine
            .create_order(draft(vec![
                line(1, 2, Decimal::new(5000, 2)),
                line(2, 3, Decimal::new(12000, 2)),
            ]))
            .await;
        assert!(matches!(result, Err(EngineError::InsufficientStock { product_id: 2 })));

        // No partial decrement, no notification.
        assert_eq!(catalog.stock_of(ProductId(1)).await, Some(25));
        assert_eq!(catalog.stock_of(ProductId(2)).await, Some(2));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_never_fails_the_order() {
        let dispatcher = Arc::new(RecordingDispatcher::failing());
        let (engine, _) = fixture(dispatcher).await;

        let order = engine
            .create_order(draft(vec![line(1, 1, Decimal::new(5000, 2))]))
            .await
            .expect("order commits despite failing dispatcher");
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn detail_recomputes_pricing_from_current_settings() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, catalog) = fixture(dispatcher).await;

        let order = engine
            .create_order(draft(vec![line(1, 2, Decimal::new(5000, 2))]))
            .await
            .expect("create order");
        assert_eq!(order.total_amount, Decimal::from(110));

        // Raise the tax rate after the order was placed.
        catalog
            .set_settings(SettingsSnapshot {
                shipping_cost: Decimal::new(800, 2),
                free_shipping_threshold: Decimal::from(100),
                tax_rate: Decimal::from(20),
            })
            .await;

        let detail = engine.order_detail(&buyer(), order.id).await.expect("detail");
        assert_eq!(detail.pricing.subtotal, Decimal::from(100));
        assert_eq!(detail.pricing.tax, Decimal::from(20));
        // The stored total is frozen even though the breakdown moved.
        assert_eq!(detail.order.total_amount, Decimal::from(110));
    }

    #[tokio::test]
    async fn detail_is_scoped_to_admin_or_email_match() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, _) = fixture(dispatcher).await;

        let order = engine
            .create_order(draft(vec![line(1, 1, Decimal::new(5000, 2))]))
            .await
            .expect("create order");

        assert!(engine.order_detail(&admin(), order.id).await.is_ok());
        assert!(engine.order_detail(&buyer(), order.id).await.is_ok());

        let stranger = Actor::client(AccountId(5), "other@souk.test");
        let denied = engine.order_detail(&stranger, order.id).await;
        assert!(matches!(denied, Err(EngineError::Forbidden(_))));
    }

    #[tokio::test]
    async fn status_update_is_restricted_to_admin_or_owner() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, _) = fixture(dispatcher).await;

        let order = engine
            .create_order(draft(vec![line(1, 1, Decimal::new(5000, 2))]))
            .await
            .expect("create order");

        let stranger = Actor::client(AccountId(5), "other@souk.test");
        let denied = engine.update_status(&stranger, order.id, OrderStatus::Shipped).await;
        assert!(matches!(denied, Err(EngineError::Forbidden(_))));

        engine
            .update_status(&buyer(), order.id, OrderStatus::Cancelled)
            .await
            .expect("owner update");
        engine
            .update_status(&admin(), order.id, OrderStatus::Processing)
            .await
            .expect("admin update");

        let detail = engine.order_detail(&admin(), order.id).await.expect("detail");
        assert_eq!(detail.order.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn delete_is_admin_only() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, _) = fixture(dispatcher).await;

        let order = engine
            .create_order(draft(vec![line(1, 1, Decimal::new(5000, 2))]))
            .await
            .expect("create order");

        let denied = engine.delete_order(&buyer(), order.id).await;
        assert!(matches!(denied, Err(EngineError::Forbidden(_))));

        engine.delete_order(&admin(), order.id).await.expect("delete");
        let gone = engine.order_detail(&admin(), order.id).await;
        assert!(matches!(gone, Err(EngineError::NotFound { entity: "order", .. })));
    }

    #[tokio::test]
    async fn lists_are_scoped_by_email_for_non_admins() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let (engine, _) = fixture(dispatcher).await;

        engine
            .create_order(draft(vec![line(1, 1, Decimal::new(5000, 2))]))
            .await
            .expect("create first");
        let mut other = draft(vec![line(1, 1, Decimal::new(5000, 2))]);
        other.email = "other@souk.test".to_string();
        engine.create_order(other).await.expect("create second");

        let all = engine.list_orders(&admin(), 0, 10).await.expect("admin list");
        assert_eq!(all.len(), 2);

        let mine = engine.list_orders(&buyer(), 0, 10).await.expect("buyer list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].email, "mouna@souk.test");
    }
}
