//! # Line-Item Calculator
//!
//! Computes HT/TTC unit prices and line totals for a single item.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Line-Item Pricing                                    │
//! │                                                                         │
//! │  price_from_ht(10.00, qty 2, 21%)      price_from_ttc(19.99, qty 3, 6%)│
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  unit TTC = round(1000 × 1.21)         unit HT = round(1999 / 1.06)    │
//! │           = 1210                                = 1886                  │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  total HT  = 1000 × 2 = 2000           total HT  = 1886 × 3 = 5658     │
//! │  total TTC = 1210 × 2 = 2420           total TTC = 1999 × 3 = 5997     │
//! │                                                                         │
//! │  ONE rounding step (the unit conversion); totals are exact products.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CatalogProduct, VatRate};
use crate::validation::{validate_price, validate_quantity, validate_vat_rate};

// =============================================================================
// Line Pricing
// =============================================================================

/// The four monetary fields of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LinePricing {
    pub unit_price_ht: Money,
    pub unit_price_ttc: Money,
    pub total_price_ht: Money,
    pub total_price_ttc: Money,
}

impl LinePricing {
    fn from_units(unit_price_ht: Money, unit_price_ttc: Money, quantity: i64) -> Self {
        LinePricing {
            unit_price_ht,
            unit_price_ttc,
            total_price_ht: unit_price_ht.multiply_quantity(quantity),
            total_price_ttc: unit_price_ttc.multiply_quantity(quantity),
        }
    }
}

/// Prices a line from its tax-exclusive unit price.
///
/// ## Example
/// ```rust
/// use boutique_core::money::Money;
/// use boutique_core::pricing::price_from_ht;
/// use boutique_core::types::VatRate;
///
/// let line = price_from_ht(Money::from_cents(1000), 2, VatRate::from_percent(21)).unwrap();
/// assert_eq!(line.unit_price_ttc.cents(), 1210);
/// assert_eq!(line.total_price_ht.cents(), 2000);
/// assert_eq!(line.total_price_ttc.cents(), 2420);
/// ```
///
/// ## Errors
/// - `InvalidQuantity` when quantity < 1
/// - `QuantityTooLarge` when quantity > 999
/// - `InvalidVatRate` when the rate is above 100%
/// - `Validation` when the price is negative
pub fn price_from_ht(unit_ht: Money, quantity: i64, rate: VatRate) -> CoreResult<LinePricing> {
    check_inputs(unit_ht, "unit_price_ht", quantity, rate)?;
    Ok(LinePricing::from_units(unit_ht, unit_ht.add_vat(rate), quantity))
}

/// Prices a line from its tax-inclusive unit price.
///
/// The TTC price is kept as given; only the HT price is derived.
pub fn price_from_ttc(unit_ttc: Money, quantity: i64, rate: VatRate) -> CoreResult<LinePricing> {
    check_inputs(unit_ttc, "unit_price_ttc", quantity, rate)?;
    Ok(LinePricing::from_units(unit_ttc.remove_vat(rate), unit_ttc, quantity))
}

fn check_inputs(price: Money, field: &str, quantity: i64, rate: VatRate) -> CoreResult<()> {
    validate_quantity(quantity)?;
    validate_vat_rate(rate)?;
    validate_price(price, field)?;
    Ok(())
}

// =============================================================================
// Priced Line
// =============================================================================

/// Anything that carries line totals at a single VAT rate.
///
/// Cart lines, order items and credit note items all implement this so the
/// same aggregation folds each of them.
pub trait PricedLine {
    fn vat_rate(&self) -> VatRate;
    fn total_price_ht(&self) -> Money;
    fn total_price_ttc(&self) -> Money;

    /// VAT collected on this line (`total TTC - total HT`).
    fn vat_amount(&self) -> Money {
        self.total_price_ttc() - self.total_price_ht()
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product line in a cart (and, once copied, in an order).
///
/// ## Snapshot Semantics
/// `product_name`, the unit prices and `vat_rate` are captured from the
/// catalog when the line is created. Quantity changes re-derive the totals
/// from these frozen unit prices; the catalog is never consulted again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_ht: Money,
    pub unit_price_ttc: Money,
    pub vat_rate: VatRate,
    pub total_price_ht: Money,
    pub total_price_ttc: Money,
}

impl LineItem {
    /// Creates a line from the catalog's current record.
    pub fn from_product(product: &CatalogProduct, quantity: i64) -> CoreResult<Self> {
        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id));
        }

        let pricing = price_from_ht(product.price_ht(), quantity, product.vat_rate())?;

        Ok(LineItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price_ht: pricing.unit_price_ht,
            unit_price_ttc: pricing.unit_price_ttc,
            vat_rate: product.vat_rate(),
            total_price_ht: pricing.total_price_ht,
            total_price_ttc: pricing.total_price_ttc,
        })
    }

    /// Returns the same line at a different quantity, keeping unit prices.
    pub fn with_quantity(&self, quantity: i64) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        let pricing = LinePricing::from_units(self.unit_price_ht, self.unit_price_ttc, quantity);

        Ok(LineItem {
            quantity,
            total_price_ht: pricing.total_price_ht,
            total_price_ttc: pricing.total_price_ttc,
            ..self.clone()
        })
    }

    pub fn pricing(&self) -> LinePricing {
        LinePricing {
            unit_price_ht: self.unit_price_ht,
            unit_price_ttc: self.unit_price_ttc,
            total_price_ht: self.total_price_ht,
            total_price_ttc: self.total_price_ttc,
        }
    }
}

impl PricedLine for LineItem {
    fn vat_rate(&self) -> VatRate {
        self.vat_rate
    }

    fn total_price_ht(&self) -> Money {
        self.total_price_ht
    }

    fn total_price_ttc(&self) -> Money {
        self.total_price_ttc
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
