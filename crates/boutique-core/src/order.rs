//! # Orders
//!
//! Immutable monetary records created from a cart at checkout.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Order Lifecycle                                 │
//! │                                                                         │
//! │  Cart ──► build_new_order() ──► NewOrder ──► create_order() ──► Order   │
//! │                                 (snapshot)    (one transaction)         │
//! │                                                                         │
//! │  After creation only `delivered` changes. Items, prices, names and     │
//! │  snapshots stay exactly as they were captured, whatever happens to the  │
//! │  catalog afterwards. Corrections go through credit notes.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{aggregate, CartSummary};
use crate::money::Money;
use crate::pricing::{LineItem, PricedLine};
use crate::snapshot::{AddressSnapshot, CustomerSnapshot};
use crate::types::{PaymentMethod, VatRate};

// =============================================================================
// Order Item
// =============================================================================

/// A cart line frozen into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_ht: Money,
    pub unit_price_ttc: Money,
    pub vat_rate: VatRate,
    pub total_price_ht: Money,
    pub total_price_ttc: Money,
}

/// Copies every field verbatim. Nothing is re-derived.
impl From<&LineItem> for OrderItem {
    fn from(line: &LineItem) -> Self {
        OrderItem {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_ht: line.unit_price_ht,
            unit_price_ttc: line.unit_price_ttc,
            vat_rate: line.vat_rate,
            total_price_ht: line.total_price_ht,
            total_price_ttc: line.total_price_ttc,
        }
    }
}

impl PricedLine for OrderItem {
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
// New Order
// =============================================================================

/// Everything persistence needs to write an order in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// Source cart. Persistence keeps this unique so a cart yields one order.
    pub cart_id: String,
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderItem>,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub summary: CartSummary,
    pub payment_method: PaymentMethod,
    /// Payment processor session or intent id, when known.
    pub payment_reference: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub cart_id: String,
    pub customer_id: Option<i64>,
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderItem>,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub summary: CartSummary,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub delivered: bool,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materializes a persisted order from its snapshot.
    pub fn from_new(id: String, new_order: NewOrder, created_at: DateTime<Utc>) -> Self {
        Order {
            id,
            customer_id: new_order.customer.customer_id(),
            cart_id: new_order.cart_id,
            customer: new_order.customer,
            items: new_order.items,
            shipping_address: new_order.shipping_address,
            billing_address: new_order.billing_address,
            summary: new_order.summary,
            payment_method: new_order.payment_method,
            payment_reference: new_order.payment_reference,
            delivered: false,
            delivered_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[inline]
    pub fn total_amount_ht(&self) -> Money {
        self.summary.totals.total_ht
    }

    #[inline]
    pub fn total_amount_ttc(&self) -> Money {
        self.summary.totals.total_ttc
    }

    pub fn item(&self, product_id: i64) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Marks the order delivered. Returns `false` if it already was.
    pub fn mark_delivered(&mut self, at: DateTime<Utc>) -> bool {
        if self.delivered {
            return false;
        }

        self.delivered = true;
        self.delivered_at = Some(at);
        self.updated_at = at;
        true
    }

    /// Whether the stored summary still matches the frozen items.
    pub fn is_consistent(&self) -> bool {
        aggregate(&self.items) == self.summary
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{AddressSnapshotV1, CustomerSnapshotV2};

    fn line(product_id: i64, unit_ht: i64, quantity: i64) -> LineItem {
        let pricing =
            crate::pricing::price_from_ht(Money::from_cents(unit_ht), quantity, VatRate::from_percent(21))
                .unwrap();
        LineItem {
            product_id,
            product_name: format!("Product {}", product_id),
            quantity,
            unit_price_ht: pricing.unit_price_ht,
            unit_price_ttc: pricing.unit_price_ttc,
            vat_rate: VatRate::from_percent(21),
            total_price_ht: pricing.total_price_ht,
            total_price_ttc: pricing.total_price_ttc,
        }
    }

    fn address() -> AddressSnapshot {
        AddressSnapshot::V1(AddressSnapshotV1 {
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            company: None,
            street: "Rue Neuve 1".to_string(),
            street2: None,
            postal_code: "1000".to_string(),
            city: "Bruxelles".to_string(),
            country: "BE".to_string(),
        })
    }

    fn order() -> Order {
        let items: Vec<OrderItem> = [line(1, 1000, 2), line(2, 999, 1)].iter().map(OrderItem::from).collect();
        let new_order = NewOrder {
            cart_id: "cart-1".to_string(),
            customer: CustomerSnapshot::V2(CustomerSnapshotV2 {
                customer_id: Some(7),
                first_name: "Marie".to_string(),
                last_name: "Dupont".to_string(),
                email: "marie@example.be".to_string(),
                phone: None,
            }),
            summary: aggregate(&items),
            items,
            shipping_address: address(),
            billing_address: address(),
            payment_method: PaymentMethod::Card,
            payment_reference: None,
        };
        Order::from_new("order-1".to_string(), new_order, Utc::now())
    }

    #[test]
    fn test_order_item_copies_line_verbatim() {
        let source = line(1, 1999, 3);
        let item = OrderItem::from(&source);

        assert_eq!(item.product_name, source.product_name);
        assert_eq!(item.unit_price_ttc, source.unit_price_ttc);
        assert_eq!(item.total_price_ttc, source.total_price_ttc);
        assert_eq!(item.vat_rate, source.vat_rate);
    }

    #[test]
    fn test_from_new_takes_customer_id_from_snapshot() {
        let order = order();
        assert_eq!(order.customer_id, Some(7));
        assert!(!order.delivered);
        assert!(order.is_consistent());
        assert_eq!(order.total_amount_ttc().cents(), 2420 + 1209);
    }

    #[test]
    fn test_mark_delivered_once() {
        let mut order = order();
        let now = Utc::now();

        assert!(order.mark_delivered(now));
        assert!(!order.mark_delivered(now));
        assert_eq!(order.delivered_at, Some(now));
    }

    #[test]
    fn test_order_json_round_trip_keeps_monetary_fields() {
        let order = order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(back.items, order.items);
        assert_eq!(back.summary, order.summary);
    }
}
