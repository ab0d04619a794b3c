//! Visibility scoping: restricting which records a query returns based on
//! the caller's role and ownership relation to the record.

use crate::domain::actor::{Actor, Role};
use crate::domain::freelancer::FreelancerId;
use crate::domain::order::Order;
use crate::domain::proposal::Proposal;
use crate::domain::quotation::Quotation;
use crate::errors::EngineError;

/// How a quotation list query must be scoped for a given actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuotationScope {
    All,
    /// Quotations joined to proposals held by this freelancer.
    InvitedFreelancer(FreelancerId),
    /// Quotations owned by user id or matched by submitted email.
    Requester { account_id: Option<i64>, email: Option<String> },
}

/// How an order list query must be scoped for a given actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Email(String),
}

pub fn quotation_scope(actor: &Actor) -> Result<QuotationScope, EngineError> {
    match actor.role {
        Role::Admin => Ok(QuotationScope::All),
        Role::Freelancer => match actor.freelancer_id {
            Some(id) => Ok(QuotationScope::InvitedFreelancer(id)),
            None => Err(EngineError::forbidden("account is not linked to a freelancer profile")),
        },
        Role::Client | Role::Guest => Ok(QuotationScope::Requester {
            account_id: actor.account_id.map(|id| id.0),
            email: actor.email.clone(),
        }),
    }
}

pub fn order_scope(actor: &Actor) -> OrderScope {
    if actor.is_admin() {
        OrderScope::All
    } else {
        OrderScope::Email(actor.email.clone().unwrap_or_default())
    }
}

/// Single-record read rule for quotations. The freelancer branch needs the
/// quotation's proposals, which the caller has already loaded.
pub fn can_view_quotation(actor: &Actor, quotation: &Quotation, proposals: &[Proposal]) -> bool {
    if actor.is_admin() {
        return true;
    }

    if actor.role == Role::Freelancer {
        if let Some(freelancer_id) = actor.freelancer_id {
            if proposals.iter().any(|p| p.freelancer_id == freelancer_id) {
                return true;
            }
        }
    }

    let owns_by_id = match (actor.account_id, quotation.user_id) {
        (Some(own), Some(requester)) => own == requester,
        _ => false,
    };
    owns_by_id || actor.email_matches(&quotation.contact.email)
}

/// Single-record read rule for orders: admin, or exact email match.
pub fn can_view_order(actor: &Actor, order: &Order) -> bool {
    actor.is_admin() || actor.email_matches(&order.email)
}
