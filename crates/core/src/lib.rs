pub mod config;
pub mod domain;
pub mod errors;
pub mod order_code;
pub mod policy;
pub mod pricing;
pub mod visibility;

pub use chrono;
pub use rust_decimal;

pub use domain::actor::{AccountId, Actor, IdentityProvider, Role};
pub use domain::freelancer::{Freelancer, FreelancerId};
pub use domain::order::{
    NewOrderItemRecord, NewOrderRecord, Order, OrderDraft, OrderId, OrderItem, OrderItemDraft,
    OrderItemId, OrderStatus,
};
pub use domain::product::{Product, ProductId, Service, ServiceId};
pub use domain::proposal::{Proposal, ProposalId, ProposalStatus};
pub use domain::quotation::{
    NewQuotation, Quotation, QuotationContact, QuotationId, QuotationPatch, QuotationStatus,
};
pub use domain::settings::SettingsSnapshot;
pub use errors::EngineError;
pub use policy::Policy;
pub use pricing::PricingBreakdown;
pub use visibility::{
    can_view_order, can_view_quotation, order_scope, quotation_scope, OrderScope, QuotationScope,
};
