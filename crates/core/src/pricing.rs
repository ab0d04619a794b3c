use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::OrderItemDraft;
use crate::domain::settings::SettingsSnapshot;

/// Pricing of an order computed at creation time from the settings snapshot
/// active at that moment. `total` is what gets frozen into the order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Price an order from client-submitted lines: `subtotal = Σ price × qty`,
/// shipping waived at or above the free-shipping threshold, tax as a
/// percentage of the subtotal.
pub fn price_order(items: &[OrderItemDraft], settings: &SettingsSnapshot) -> PricingBreakdown {
    let subtotal = items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum::<Decimal>();
    breakdown_for(subtotal, settings)
}

/// Display-time recomputation of shipping and tax for an already-priced
/// subtotal. Uses the caller-supplied (current) settings snapshot.
pub fn breakdown_for(subtotal: Decimal, settings: &SettingsSnapshot) -> PricingBreakdown {
    let shipping = if subtotal >= settings.free_shipping_threshold {
        Decimal::ZERO
    } else {
        settings.shipping_cost
    };
    let tax = subtotal * settings.tax_rate / Decimal::from(100);

    PricingBreakdown { subtotal, shipping, tax, total: subtotal + shipping + tax }
}
