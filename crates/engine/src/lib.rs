//! The workflow engine: the quotation/proposal bidding state machine and the
//! inventory-backed order transaction engine, operating over the repository
//! traits with explicitly injected authorization policies.

pub mod lifecycle;
pub mod orders;

pub use lifecycle::{InviteOutcome, LifecycleManager, LifecyclePolicies, QuotationDetail};
pub use orders::{OrderDetail, OrderEngine};
