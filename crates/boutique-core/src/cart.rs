//! # Cart
//!
//! The cart aggregate and the totals fold (the "Cart Aggregator").
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Mutations                                   │
//! │                                                                         │
//! │  add_item(product, qty) ──┐                                             │
//! │  update_quantity(id, qty) ├──► items changed ──► aggregate(items)       │
//! │  remove_item(id) ─────────┤                        │                    │
//! │  clear() ─────────────────┘                        ▼                    │
//! │                                          summary replaced, version += 1 │
//! │                                                                         │
//! │  The summary is never patched incrementally: every mutation folds the   │
//! │  full item list again, so a cart read back is always self-consistent.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::order::OrderItem;
use crate::pricing::{LineItem, PricedLine};
use crate::types::{CartOwner, CatalogProduct, VatRate};
use crate::validation::{validate_cart_size, validate_quantity};

// =============================================================================
// Aggregation
// =============================================================================

/// VAT collected at one rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VatBreakdownEntry {
    pub rate: VatRate,
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_ht: Money,
    pub total_vat: Money,
    pub total_ttc: Money,
}

/// Totals plus the per-rate VAT breakdown of a list of lines.
///
/// Shared by carts, orders and credit notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub totals: CartTotals,
    /// One entry per distinct rate, ascending by rate.
    pub vat_breakdown: Vec<VatBreakdownEntry>,
}

/// Folds line items into totals and a VAT breakdown.
///
/// ## Algorithm
/// One pass over the items, summing line totals and bucketing each line's
/// VAT (`total TTC - total HT`) by rate in a `BTreeMap`, which yields the
/// buckets in ascending rate order. All amounts are integer cents, so the
/// breakdown partitions `total_vat` exactly.
///
/// ## Example
/// ```rust
/// use boutique_core::cart::aggregate;
/// use boutique_core::money::Money;
/// use boutique_core::pricing::LineItem;
///
/// let summary = aggregate::<LineItem>(&[]);
/// assert_eq!(summary.totals.total_ttc, Money::zero());
/// assert!(summary.vat_breakdown.is_empty());
/// ```
pub fn aggregate<L: PricedLine>(items: &[L]) -> CartSummary {
    let mut total_ht = Money::zero();
    let mut total_ttc = Money::zero();
    let mut by_rate: BTreeMap<VatRate, Money> = BTreeMap::new();

    for item in items {
        total_ht += item.total_price_ht();
        total_ttc += item.total_price_ttc();
        *by_rate.entry(item.vat_rate()).or_default() += item.vat_amount();
    }

    CartSummary {
        totals: CartTotals {
            total_ht,
            total_vat: total_ttc - total_ht,
            total_ttc,
        },
        vat_breakdown: by_rate
            .into_iter()
            .map(|(rate, amount)| VatBreakdownEntry { rate, amount })
            .collect(),
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A customer's or session's working set of lines.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Every quantity is within 1..=999
/// - At most 100 distinct lines
/// - `summary == aggregate(&items)` after every mutation
///
/// `version` increases on every mutation; the cart store uses it for
/// compare-and-set writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub owner: CartOwner,
    pub items: Vec<LineItem>,
    pub summary: CartSummary,
    pub version: u64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for an owner.
    pub fn new(owner: CartOwner) -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4().to_string(),
            owner,
            items: Vec::new(),
            summary: CartSummary::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a product, merging with an existing line for the same product.
    ///
    /// ## Behavior
    /// - Existing line: quantity increases, the line keeps the unit prices
    ///   captured when it was first added
    /// - New line: name, prices and rate are snapshotted from `product`
    pub fn add_item(&mut self, product: &CatalogProduct, quantity: i64) -> CoreResult<()> {
        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id));
        }
        validate_quantity(quantity)?;

        match self.items.iter().position(|i| i.product_id == product.id) {
            Some(index) => {
                let merged = self.items[index].quantity + quantity;
                self.items[index] = self.items[index].with_quantity(merged)?;
            }
            None => {
                validate_cart_size(self.items.len())?;
                self.items.push(LineItem::from_product(product, quantity)?);
            }
        }

        self.touch();
        Ok(())
    }

    /// Sets the quantity of a line. A quantity of 0 removes it.
    pub fn update_quantity(&mut self, product_id: i64, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            self.remove_item(product_id)?;
            return Ok(());
        }

        let index = self.position(product_id)?;
        self.items[index] = self.items[index].with_quantity(quantity)?;

        self.touch();
        Ok(())
    }

    /// Removes a line and returns it.
    pub fn remove_item(&mut self, product_id: i64) -> CoreResult<LineItem> {
        let index = self.position(product_id)?;
        let removed = self.items.remove(index);

        self.touch();
        Ok(removed)
    }

    /// Removes every line.
    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn line(&self, product_id: i64) -> Option<&LineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// What is left once `ordered` has been checked out.
    ///
    /// Each line loses the ordered quantity of its product; fully ordered
    /// lines disappear. The remainder is a new cart (fresh id, same owner)
    /// whose version continues from this one.
    pub fn remainder_after(&self, ordered: &[OrderItem]) -> Cart {
        let mut remainder = Cart::new(self.owner.clone());
        remainder.items = self
            .items
            .iter()
            .filter_map(|line| {
                let taken: i64 = ordered
                    .iter()
                    .filter(|item| item.product_id == line.product_id)
                    .map(|item| item.quantity)
                    .sum();
                let left = line.quantity - taken;
                if left < 1 {
                    return None;
                }
                line.with_quantity(left).ok()
            })
            .collect();
        remainder.version = self.version;
        remainder.touch();
        remainder
    }

    fn position(&self, product_id: i64) -> CoreResult<usize> {
        self.items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or(CoreError::ItemNotInCart { product_id })
    }

    fn touch(&mut self) {
        self.summary = aggregate(&self.items);
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, price_ht_cents: i64, vat_rate_bps: u32) -> CatalogProduct {
        CatalogProduct {
            id,
            name: format!("Product {}", id),
            description: None,
            price_ht_cents,
            vat_rate_bps,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session_cart() -> Cart {
        Cart::new(CartOwner::Session("s-1".to_string()))
    }

    #[test]
    fn test_empty_cart_aggregates_to_zero() {
        let summary = aggregate::<LineItem>(&[]);

        assert_eq!(summary.totals.total_ht, Money::zero());
        assert_eq!(summary.totals.total_vat, Money::zero());
        assert_eq!(summary.totals.total_ttc, Money::zero());
        assert!(summary.vat_breakdown.is_empty());
    }

    #[test]
    fn test_two_rates_give_two_breakdown_entries() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1000, 2100), 2).unwrap();
        cart.add_item(&product(2, 500, 600), 3).unwrap();

        let summary = &cart.summary;
        assert_eq!(summary.vat_breakdown.len(), 2);
        assert_eq!(summary.vat_breakdown[0].rate, VatRate::from_percent(6));
        assert_eq!(summary.vat_breakdown[1].rate, VatRate::from_percent(21));

        // 21%: 2 × (1210 - 1000) = 420; 6%: 3 × (530 - 500) = 90
        assert_eq!(summary.vat_breakdown[0].amount.cents(), 90);
        assert_eq!(summary.vat_breakdown[1].amount.cents(), 420);

        let breakdown_sum: Money = summary.vat_breakdown.iter().map(|e| e.amount).sum();
        assert_eq!(breakdown_sum, summary.totals.total_vat);
        assert_eq!(summary.totals.total_ttc.cents(), 2420 + 1590);
    }

    #[test]
    fn test_total_equals_sum_of_line_ttc() {
        let mut cart = session_cart();
        for (id, price, bps) in [(1, 999, 2100), (2, 1, 550), (3, 12345, 1200), (4, 333, 0)] {
            cart.add_item(&product(id, price, bps), id).unwrap();
        }

        let line_sum: Money = cart.items.iter().map(|i| i.total_price_ttc).sum();
        assert_eq!(cart.summary.totals.total_ttc, line_sum);
        assert!(cart.summary.vat_breakdown.iter().all(|e| !e.amount.is_negative()));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1999, 2100), 2).unwrap();
        cart.add_item(&product(2, 450, 600), 1).unwrap();

        assert_eq!(aggregate(&cart.items), aggregate(&cart.items));
        assert_eq!(aggregate(&cart.items), cart.summary);
    }

    #[test]
    fn test_add_same_product_merges_and_keeps_snapshot_price() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1000, 2100), 1).unwrap();

        // catalog price changed after the first add
        cart.add_item(&product(1, 1500, 2100), 2).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].unit_price_ht.cents(), 1000);
        assert_eq!(cart.summary.totals.total_ht.cents(), 3000);
    }

    #[test]
    fn test_merge_cannot_exceed_max_quantity() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 100, 2100), 998).unwrap();

        assert!(matches!(
            cart.add_item(&product(1, 100, 2100), 2),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
        assert_eq!(cart.items[0].quantity, 998);
    }

    #[test]
    fn test_inactive_product_rejected() {
        let mut cart = session_cart();
        let mut p = product(1, 100, 2100);
        p.is_active = false;

        assert!(matches!(cart.add_item(&p, 1), Err(CoreError::ProductInactive(1))));
        assert!(cart.is_empty());
        assert_eq!(cart.version, 0);
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = session_cart();
        for id in 0..crate::MAX_CART_ITEMS as i64 {
            cart.add_item(&product(id, 100, 2100), 1).unwrap();
        }

        assert!(matches!(
            cart.add_item(&product(1_000, 100, 2100), 1),
            Err(CoreError::CartTooLarge { .. })
        ));
        // merging into an existing line is still allowed
        assert!(cart.add_item(&product(0, 100, 2100), 1).is_ok());
    }

    #[test]
    fn test_update_quantity_reaggregates() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1000, 2100), 1).unwrap();
        cart.update_quantity(1, 4).unwrap();

        assert_eq!(cart.summary.totals.total_ttc.cents(), 4840);
        assert_eq!(cart.version, 2);
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1000, 2100), 1).unwrap();
        cart.update_quantity(1, 0).unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.summary, CartSummary::default());
    }

    #[test]
    fn test_update_and_remove_unknown_line() {
        let mut cart = session_cart();
        assert!(matches!(
            cart.update_quantity(9, 2),
            Err(CoreError::ItemNotInCart { product_id: 9 })
        ));
        assert!(matches!(
            cart.remove_item(9),
            Err(CoreError::ItemNotInCart { product_id: 9 })
        ));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1000, 2100), 1).unwrap();

        assert!(matches!(
            cart.update_quantity(1, -1),
            Err(CoreError::InvalidQuantity { quantity: -1 })
        ));
        assert!(matches!(
            cart.add_item(&product(1, 1000, 2100), 0),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_clear_bumps_version() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1000, 2100), 2).unwrap();
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.version, 2);
    }

    #[test]
    fn test_remainder_after_keeps_unordered_quantities() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1000, 2100), 2).unwrap();
        let ordered: Vec<OrderItem> = cart.items.iter().map(OrderItem::from).collect();

        cart.add_item(&product(1, 1000, 2100), 1).unwrap();
        cart.add_item(&product(3, 500, 600), 2).unwrap();

        let remainder = cart.remainder_after(&ordered);
        assert_ne!(remainder.id, cart.id);
        assert_eq!(remainder.owner, cart.owner);
        assert_eq!(remainder.line(1).map(|l| l.quantity), Some(1));
        assert_eq!(remainder.line(3).map(|l| l.quantity), Some(2));
        assert_eq!(remainder.summary, aggregate(&remainder.items));
        assert_eq!(remainder.version, cart.version + 1);

        let all: Vec<OrderItem> = cart.items.iter().map(OrderItem::from).collect();
        assert!(cart.remainder_after(&all).is_empty());
    }

    #[test]
    fn test_cart_json_round_trip_keeps_money() {
        let mut cart = session_cart();
        cart.add_item(&product(1, 1999, 2100), 3).unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
