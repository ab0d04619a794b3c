use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use souk_core::domain::actor::{Actor, IdentityProvider};
use souk_core::domain::freelancer::{Freelancer, FreelancerId};
use souk_core::domain::order::{
    NewOrderRecord, Order, OrderId, OrderItem, OrderItemId, OrderStatus,
};
use souk_core::domain::product::{Product, ProductId, Service, ServiceId};
use souk_core::domain::proposal::{Proposal, ProposalId, ProposalStatus};
use souk_core::domain::quotation::{NewQuotation, Quotation, QuotationId, QuotationStatus};
use souk_core::domain::settings::SettingsSnapshot;
use souk_core::errors::EngineError;
use souk_core::visibility::{OrderScope, QuotationScope};

use super::{
    FreelancerRepository, OrderRepository, ProductRepository, QuotationRepository,
    RepositoryError, ServiceRepository, SettingsRepository,
};

/// In-memory quotation store mirroring the transactional guarantees of the
/// SQL implementation, for engine tests.
#[derive(Default)]
pub struct InMemoryQuotationRepository {
    quotations: RwLock<HashMap<i64, Quotation>>,
    proposals: RwLock<HashMap<i64, Proposal>>,
    next_quotation_id: AtomicI64,
    next_proposal_id: AtomicI64,
}

impl InMemoryQuotationRepository {
    fn next_quotation_id(&self) -> QuotationId {
        QuotationId(self.next_quotation_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_proposal_id(&self) -> ProposalId {
        ProposalId(self.next_proposal_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait::async_trait]
impl QuotationRepository for InMemoryQuotationRepository {
    async fn insert(&self, quotation: NewQuotation) -> Result<Quotation, RepositoryError> {
        let stored = Quotation {
            id: self.next_quotation_id(),
            service_id: quotation.service_id,
            user_id: quotation.requester,
            contact: quotation.contact,
            description: quotation.description,
            preferred_timeline: quotation.preferred_timeline,
            status: QuotationStatus::Pending,
            selected_proposal_id: None,
            created_at: Utc::now(),
        };
        self.quotations.write().await.insert(stored.id.0, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: QuotationId) -> Result<Option<Quotation>, RepositoryError> {
        Ok(self.quotations.read().await.get(&id.0).cloned())
    }

    async fn list(&self, scope: &QuotationScope) -> Result<Vec<Quotation>, RepositoryError> {
        let quotations = self.quotations.read().await;
        let proposals = self.proposals.read().await;

        let mut matched: Vec<Quotation> = quotations
            .values()
            .filter(|quotation| match scope {
                QuotationScope::All => true,
                QuotationScope::InvitedFreelancer(freelancer_id) => proposals.values().any(|p| {
                    p.quotation_id == quotation.id && p.freelancer_id == *freelancer_id
                }),
                QuotationScope::Requester { account_id, email } => {
                    let by_account = account_id
                        .is_some_and(|id| quotation.user_id.map(|u| u.0) == Some(id));
                    let by_email = email
                        .as_deref()
                        .is_some_and(|e| quotation.contact.email.eq_ignore_ascii_case(e));
                    by_account || by_email
                }
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn proposals_for(&self, id: QuotationId) -> Result<Vec<Proposal>, RepositoryError> {
        let proposals = self.proposals.read().await;
        let mut matched: Vec<Proposal> =
            proposals.values().filter(|p| p.quotation_id == id).cloned().collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matched)
    }

    async fn find_proposal(
        &self,
        quotation_id: QuotationId,
        freelancer_id: FreelancerId,
    ) -> Result<Option<Proposal>, RepositoryError> {
        let proposals = self.proposals.read().await;
        Ok(proposals
            .values()
            .find(|p| p.quotation_id == quotation_id && p.freelancer_id == freelancer_id)
            .cloned())
    }

    async fn find_proposal_by_id(
        &self,
        id: ProposalId,
    ) -> Result<Option<Proposal>, RepositoryError> {
        Ok(self.proposals.read().await.get(&id.0).cloned())
    }

    async fn create_invitation(
        &self,
        quotation_id: QuotationId,
        freelancer_id: FreelancerId,
        message: &str,
    ) -> Result<Proposal, RepositoryError> {
        let mut quotations = self.quotations.write().await;
        let mut proposals = self.proposals.write().await;

        let duplicate = proposals
            .values()
            .any(|p| p.quotation_id == quotation_id && p.freelancer_id == freelancer_id);
        if duplicate {
            return Err(RepositoryError::Conflict("freelancer already invited".to_string()));
        }

        let proposal = Proposal {
            id: self.next_proposal_id(),
            quotation_id,
            freelancer_id,
            price: Decimal::ZERO,
            message: Some(message.to_string()),
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
        };
        proposals.insert(proposal.id.0, proposal.clone());

        if let Some(quotation) = quotations.get_mut(&quotation_id.0) {
            if quotation.status == QuotationStatus::Pending {
                quotation.status = QuotationStatus::Open;
            }
        }

        Ok(proposal)
    }

    async fn record_bid(
        &self,
        id: ProposalId,
        price: Decimal,
        message: Option<String>,
    ) -> Result<Proposal, RepositoryError> {
        let mut proposals = self.proposals.write().await;
        let proposal = proposals.get_mut(&id.0).ok_or_else(|| {
            RepositoryError::Conflict(format!("proposal {} vanished before the bid", id.0))
        })?;
        proposal.price = price;
        proposal.message = message;
        proposal.status = ProposalStatus::Submitted;
        Ok(proposal.clone())
    }

    async fn accept_proposal(
        &self,
        quotation_id: QuotationId,
        proposal_id: ProposalId,
    ) -> Result<(), RepositoryError> {
        let mut quotations = self.quotations.write().await;
        let mut proposals = self.proposals.write().await;

        let quotation = quotations.get_mut(&quotation_id.0).ok_or_else(|| {
            RepositoryError::Conflict("quotation is no longer accepting proposals".to_string())
        })?;
        if !matches!(quotation.status, QuotationStatus::Pending | QuotationStatus::Open) {
            return Err(RepositoryError::Conflict(
                "quotation is no longer accepting proposals".to_string(),
            ));
        }

        let proposal = proposals
            .get_mut(&proposal_id.0)
            .filter(|p| p.quotation_id == quotation_id)
            .ok_or_else(|| {
                RepositoryError::Conflict(
                    "proposal no longer belongs to this quotation".to_string(),
                )
            })?;

        quotation.selected_proposal_id = Some(proposal_id);
        quotation.status = QuotationStatus::Assigned;
        proposal.status = ProposalStatus::Accepted;
        Ok(())
    }

    async fn save(&self, quotation: &Quotation) -> Result<(), RepositoryError> {
        self.quotations.write().await.insert(quotation.id.0, quotation.clone());
        Ok(())
    }

    async fn delete(&self, id: QuotationId) -> Result<(), RepositoryError> {
        self.quotations.write().await.remove(&id.0);
        self.proposals.write().await.retain(|_, p| p.quotation_id != id);
        Ok(())
    }
}

/// In-memory catalog covering products, services, freelancers and settings.
/// The order repository borrows it to apply all-or-nothing stock decrements.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<i64, Product>>,
    services: RwLock<HashMap<i64, Service>>,
    freelancers: RwLock<HashMap<i64, Freelancer>>,
    settings: RwLock<SettingsSnapshot>,
}

impl InMemoryCatalog {
    pub async fn put_product(&self, product: Product) {
        self.products.write().await.insert(product.id.0, product);
    }

    pub async fn put_service(&self, service: Service) {
        self.services.write().await.insert(service.id.0, service);
    }

    pub async fn put_freelancer(&self, freelancer: Freelancer) {
        self.freelancers.write().await.insert(freelancer.id.0, freelancer);
    }

    pub async fn set_settings(&self, settings: SettingsSnapshot) {
        *self.settings.write().await = settings;
    }

    pub async fn stock_of(&self, id: ProductId) -> Option<i64> {
        self.products.read().await.get(&id.0).map(|p| p.stock_quantity)
    }

    /// Decrement stock for every (product, quantity) pair or none of them.
    async fn decrement_stock_batch(
        &self,
        decrements: &[(ProductId, i64)],
    ) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        for (product_id, quantity) in decrements {
            let covered = products
                .get(&product_id.0)
                .is_some_and(|product| product.stock_quantity >= *quantity);
            if !covered {
                return Err(RepositoryError::InsufficientStock(product_id.0));
            }
        }
        for (product_id, quantity) in decrements {
            if let Some(product) = products.get_mut(&product_id.0) {
                product.stock_quantity -= quantity;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id.0).cloned())
    }
}

#[async_trait::async_trait]
impl ServiceRepository for InMemoryCatalog {
    async fn find_by_id(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        Ok(self.services.read().await.get(&id.0).cloned())
    }
}

#[async_trait::async_trait]
impl FreelancerRepository for InMemoryCatalog {
    async fn find_by_id(&self, id: FreelancerId) -> Result<Option<Freelancer>, RepositoryError> {
        Ok(self.freelancers.read().await.get(&id.0).cloned())
    }
}

#[async_trait::async_trait]
impl SettingsRepository for InMemoryCatalog {
    async fn current(&self) -> Result<SettingsSnapshot, RepositoryError> {
        Ok(self.settings.read().await.clone())
    }
}

/// In-memory order store. Stock decrements go through the shared catalog so
/// tests observe the same all-or-nothing behavior as the SQL transaction.
pub struct InMemoryOrderRepository {
    catalog: Arc<InMemoryCatalog>,
    orders: RwLock<HashMap<i64, Order>>,
    next_order_id: AtomicI64,
    next_item_id: AtomicI64,
}

impl InMemoryOrderRepository {
    pub fn new(catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            catalog,
            orders: RwLock::new(HashMap::new()),
            next_order_id: AtomicI64::new(0),
            next_item_id: AtomicI64::new(0),
        }
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, record: NewOrderRecord) -> Result<Order, RepositoryError> {
        let decrements: Vec<(ProductId, i64)> =
            record.items.iter().map(|item| (item.product_id, item.quantity)).collect();
        self.catalog.decrement_stock_batch(&decrements).await?;

        let order_id = OrderId(self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1);
        let items = record
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: OrderItemId(self.next_item_id.fetch_add(1, Ordering::SeqCst) + 1),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                name: Some(item.name),
                color: item.color,
                size: item.size,
            })
            .collect();

        let order = Order {
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
            created_at: Utc::now(),
            items,
        };
        self.orders.write().await.insert(order.id.0, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id.0).cloned())
    }

    async fn list(
        &self,
        scope: &OrderScope,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matched: Vec<Order> = orders
            .values()
            .filter(|order| match scope {
                OrderScope::All => true,
                OrderScope::Email(email) => order.email.eq_ignore_ascii_case(email),
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = offset.max(0) as usize;
        let limit = limit.max(0) as usize;
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id.0) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        self.orders.write().await.remove(&id.0);
        Ok(())
    }
}

/// Credential-to-actor map for tests.
#[derive(Default)]
pub struct StaticIdentityProvider {
    actors: HashMap<String, Actor>,
}

impl StaticIdentityProvider {
    pub fn with_actor(mut self, credential: impl Into<String>, actor: Actor) -> Self {
        self.actors.insert(credential.into(), actor);
        self
    }
}

#[async_trait::async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, credential: &str) -> Result<Option<Actor>, EngineError> {
        Ok(self.actors.get(credential).cloned())
    }
}
