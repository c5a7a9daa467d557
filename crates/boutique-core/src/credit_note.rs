//! # Credit Notes
//!
//! Partial or full monetary reversals of an order.
//!
//! ## Issuing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Credit Note Flow                                 │
//! │                                                                         │
//! │  Order items (frozen prices)                                            │
//! │       │                                                                 │
//! │       ├── requested lines {productId, quantity}   (empty = everything   │
//! │       │                                            not yet credited)    │
//! │       ├── quantities already credited by earlier notes                  │
//! │       ▼                                                                 │
//! │  build_credit_note(.., policy)                                          │
//! │       │   Strict:        credited + requested <= ordered                │
//! │       │   AllowGoodwill: no quantity cap                                │
//! │       ▼                                                                 │
//! │  NewCreditNote ──► persisted as `pending` ──► mark_refunded()           │
//! │                                               `refunded` (final)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{aggregate, CartSummary};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::{Order, OrderItem};
use crate::pricing::PricedLine;
use crate::types::VatRate;
use crate::validation::{validate_quantity, validate_required_text};

const MAX_REASON_LEN: usize = 500;

// =============================================================================
// Status and Policy
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditNoteStatus {
    Pending,
    Refunded,
}

impl CreditNoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditNoteStatus::Pending => "pending",
            CreditNoteStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for CreditNoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a credit note may go beyond what was ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditPolicy {
    /// Cumulative credited quantity never exceeds the ordered quantity.
    #[default]
    Strict,
    /// Goodwill credits may exceed the ordered quantity.
    AllowGoodwill,
}

impl FromStr for CreditPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "strict" => Ok(CreditPolicy::Strict),
            "allow_goodwill" => Ok(CreditPolicy::AllowGoodwill),
            _ => Err(ValidationError::NotAllowed {
                field: "credit_policy".to_string(),
                allowed: vec!["strict".to_string(), "allow_goodwill".to_string()],
            }),
        }
    }
}

// =============================================================================
// Credit Note Types
// =============================================================================

/// One requested line: which order item, how many units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditLineRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditNoteItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_ht: Money,
    pub unit_price_ttc: Money,
    pub vat_rate: VatRate,
    pub total_price_ht: Money,
    pub total_price_ttc: Money,
}

impl CreditNoteItem {
    /// Credits `quantity` units at the order item's frozen unit prices.
    fn from_order_item(item: &OrderItem, quantity: i64) -> Self {
        CreditNoteItem {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity,
            unit_price_ht: item.unit_price_ht,
            unit_price_ttc: item.unit_price_ttc,
            vat_rate: item.vat_rate,
            total_price_ht: item.unit_price_ht.multiply_quantity(quantity),
            total_price_ttc: item.unit_price_ttc.multiply_quantity(quantity),
        }
    }
}

impl PricedLine for CreditNoteItem {
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

/// A credit note ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCreditNote {
    pub order_id: String,
    pub reason: String,
    pub items: Vec<CreditNoteItem>,
    pub summary: CartSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditNote {
    pub id: String,
    pub order_id: String,
    pub reason: String,
    pub status: CreditNoteStatus,
    pub items: Vec<CreditNoteItem>,
    pub summary: CartSummary,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub refunded_at: Option<DateTime<Utc>>,
}

impl CreditNote {
    pub fn from_new(id: String, new_note: NewCreditNote, created_at: DateTime<Utc>) -> Self {
        CreditNote {
            id,
            order_id: new_note.order_id,
            reason: new_note.reason,
            status: CreditNoteStatus::Pending,
            items: new_note.items,
            summary: new_note.summary,
            created_at,
            refunded_at: None,
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

    /// Moves `pending → refunded`. Any other transition is rejected.
    pub fn mark_refunded(&mut self, at: DateTime<Utc>) -> CoreResult<()> {
        if self.status != CreditNoteStatus::Pending {
            return Err(CoreError::InvalidCreditNoteStatus {
                credit_note_id: self.id.clone(),
                current_status: self.status.to_string(),
            });
        }

        self.status = CreditNoteStatus::Refunded;
        self.refunded_at = Some(at);
        Ok(())
    }
}

// =============================================================================
// Building
// =============================================================================

/// Builds a credit note against an order.
///
/// ## Parameters
/// - `lines`: requested lines; an empty slice credits every unit not yet
///   credited. Lines naming the same product are merged.
/// - `already_credited`: product id → quantity on earlier credit notes
/// - `policy`: whether the ordered quantity caps the cumulative credit
///
/// Amounts always come from the order item's frozen unit prices.
pub fn build_credit_note(
    order: &Order,
    lines: &[CreditLineRequest],
    already_credited: &HashMap<i64, i64>,
    reason: &str,
    policy: CreditPolicy,
) -> CoreResult<NewCreditNote> {
    validate_required_text("reason", reason, MAX_REASON_LEN)?;

    let credited = |product_id: i64| already_credited.get(&product_id).copied().unwrap_or(0);

    let items: Vec<CreditNoteItem> = if lines.is_empty() {
        order
            .items
            .iter()
            .filter_map(|item| {
                let remaining = item.quantity - credited(item.product_id);
                (remaining > 0).then(|| CreditNoteItem::from_order_item(item, remaining))
            })
            .collect()
    } else {
        // merge duplicates, keeping first-seen order for stable output
        let mut requested: BTreeMap<usize, (i64, i64)> = BTreeMap::new();
        for line in lines {
            validate_quantity(line.quantity)?;
            let position = order
                .items
                .iter()
                .position(|i| i.product_id == line.product_id)
                .ok_or_else(|| CoreError::ItemNotInOrder {
                    order_id: order.id.clone(),
                    product_id: line.product_id,
                })?;
            requested.entry(position).or_insert((line.product_id, 0)).1 += line.quantity;
        }

        let mut items = Vec::with_capacity(requested.len());
        for (position, (product_id, quantity)) in requested {
            validate_quantity(quantity)?;

            let item = &order.items[position];
            let already = credited(product_id);
            if policy == CreditPolicy::Strict && already + quantity > item.quantity {
                return Err(CoreError::CreditExceedsOrder {
                    product_id,
                    ordered: item.quantity,
                    already_credited: already,
                    requested: quantity,
                });
            }

            items.push(CreditNoteItem::from_order_item(item, quantity));
        }
        items
    };

    if items.is_empty() {
        return Err(CoreError::NothingToCredit(order.id.clone()));
    }

    Ok(NewCreditNote {
        order_id: order.id.clone(),
        reason: reason.trim().to_string(),
        summary: aggregate(&items),
        items,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::NewOrder;
    use crate::snapshot::{AddressSnapshot, AddressSnapshotV1, CustomerSnapshot, CustomerSnapshotV1};
    use crate::types::PaymentMethod;

    fn item(product_id: i64, unit_ht: i64, quantity: i64, bps: u32) -> OrderItem {
        let pricing =
            crate::pricing::price_from_ht(Money::from_cents(unit_ht), quantity, VatRate::from_bps(bps)).unwrap();
        OrderItem {
            product_id,
            product_name: format!("Product {}", product_id),
            quantity,
            unit_price_ht: pricing.unit_price_ht,
            unit_price_ttc: pricing.unit_price_ttc,
            vat_rate: VatRate::from_bps(bps),
            total_price_ht: pricing.total_price_ht,
            total_price_ttc: pricing.total_price_ttc,
        }
    }

    fn order() -> Order {
        let items = vec![item(1, 1000, 2, 2100), item(2, 500, 3, 600)];
        let address = AddressSnapshot::V1(AddressSnapshotV1 {
            first_name: "Jan".to_string(),
            last_name: "Peeters".to_string(),
            company: None,
            street: "Meir 10".to_string(),
            street2: None,
            postal_code: "2000".to_string(),
            city: "Antwerpen".to_string(),
            country: "BE".to_string(),
        });
        let new_order = NewOrder {
            cart_id: "cart-1".to_string(),
            customer: CustomerSnapshot::V1(CustomerSnapshotV1 {
                name: "Jan Peeters".to_string(),
                email: "jan@example.be".to_string(),
                phone: None,
            }),
            summary: aggregate(&items),
            items,
            shipping_address: address.clone(),
            billing_address: address,
            payment_method: PaymentMethod::Card,
            payment_reference: None,
        };
        Order::from_new("order-1".to_string(), new_order, Utc::now())
    }

    fn line(product_id: i64, quantity: i64) -> CreditLineRequest {
        CreditLineRequest { product_id, quantity }
    }

    #[test]
    fn test_partial_credit_uses_frozen_prices() {
        let note = build_credit_note(&order(), &[line(1, 1)], &HashMap::new(), "Damaged", CreditPolicy::Strict)
            .unwrap();

        assert_eq!(note.items.len(), 1);
        assert_eq!(note.items[0].total_price_ht.cents(), 1000);
        assert_eq!(note.items[0].total_price_ttc.cents(), 1210);
        assert_eq!(note.summary.totals.total_vat.cents(), 210);
        assert!(note.summary.totals.total_ttc >= note.summary.totals.total_ht);
    }

    #[test]
    fn test_empty_lines_credit_everything_remaining() {
        let already = HashMap::from([(1, 1)]);
        let note = build_credit_note(&order(), &[], &already, "Return", CreditPolicy::Strict).unwrap();

        assert_eq!(note.items.len(), 2);
        assert_eq!(note.items[0].quantity, 1);
        assert_eq!(note.items[1].quantity, 3);
        assert_eq!(note.summary.vat_breakdown.len(), 2);
    }

    #[test]
    fn test_nothing_left_to_credit() {
        let already = HashMap::from([(1, 2), (2, 3)]);
        assert!(matches!(
            build_credit_note(&order(), &[], &already, "Return", CreditPolicy::Strict),
            Err(CoreError::NothingToCredit(_))
        ));
    }

    #[test]
    fn test_strict_policy_caps_cumulative_quantity() {
        let already = HashMap::from([(1, 1)]);
        let err = build_credit_note(&order(), &[line(1, 1), line(1, 1)], &already, "Return", CreditPolicy::Strict)
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::CreditExceedsOrder {
                product_id: 1,
                ordered: 2,
                already_credited: 1,
                requested: 2,
            }
        ));
    }

    #[test]
    fn test_goodwill_policy_lifts_cap() {
        let note = build_credit_note(&order(), &[line(1, 5)], &HashMap::new(), "Goodwill", CreditPolicy::AllowGoodwill)
            .unwrap();
        assert_eq!(note.items[0].quantity, 5);
        assert_eq!(note.summary.totals.total_ttc.cents(), 1210 * 5);
    }

    #[test]
    fn test_unknown_product_and_bad_input_rejected() {
        let order = order();
        let none = HashMap::new();

        assert!(matches!(
            build_credit_note(&order, &[line(9, 1)], &none, "Return", CreditPolicy::Strict),
            Err(CoreError::ItemNotInOrder { product_id: 9, .. })
        ));
        assert!(matches!(
            build_credit_note(&order, &[line(1, 0)], &none, "Return", CreditPolicy::Strict),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            build_credit_note(&order, &[line(1, 1)], &none, " ", CreditPolicy::Strict),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_huge_duplicate_lines_are_rejected_before_merging() {
        let err = build_credit_note(
            &order(),
            &[line(1, i64::MAX), line(1, 1)],
            &HashMap::new(),
            "Return",
            CreditPolicy::AllowGoodwill,
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::QuantityTooLarge { requested: i64::MAX, .. }));
    }

    #[test]
    fn test_refund_transition_happens_once() {
        let new_note = build_credit_note(&order(), &[], &HashMap::new(), "Return", CreditPolicy::Strict).unwrap();
        let mut note = CreditNote::from_new("cn-1".to_string(), new_note, Utc::now());

        assert_eq!(note.status, CreditNoteStatus::Pending);
        note.mark_refunded(Utc::now()).unwrap();
        assert_eq!(note.status, CreditNoteStatus::Refunded);
        assert!(note.refunded_at.is_some());

        assert!(matches!(
            note.mark_refunded(Utc::now()),
            Err(CoreError::InvalidCreditNoteStatus { .. })
        ));
    }

    #[test]
    fn test_credit_policy_parse() {
        assert_eq!("strict".parse::<CreditPolicy>().unwrap(), CreditPolicy::Strict);
        assert_eq!("allow_goodwill".parse::<CreditPolicy>().unwrap(), CreditPolicy::AllowGoodwill);
        assert!("lenient".parse::<CreditPolicy>().is_err());
        assert_eq!(CreditPolicy::default(), CreditPolicy::Strict);
    }
}
