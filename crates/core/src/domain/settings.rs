use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The currently configured shipping/tax parameters used to price an order.
/// Retrieved from the settings collaborator at pricing time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub shipping_cost: Decimal,
    pub free_shipping_threshold: Decimal,
    /// Percentage, e.g. `10` for a 10% tax.
    pub tax_rate: Decimal,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            shipping_cost: Decimal::ZERO,
            free_shipping_threshold: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
        }
    }
}
