//! # Snapshot Translator
//!
//! One-way conversions from a finalized cart to the three downstream shapes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Translation                               │
//! │                                                                         │
//! │                   ┌──► order_items() / build_new_order() ──► NewOrder   │
//! │                   │                                                     │
//! │   Cart (&) ───────┼──► payment_items() ──► PaymentLineItem (cents)      │
//! │                   │                                                     │
//! │   Order (&) ──────┴──► email_confirmation() ──► OrderConfirmationEmail  │
//! │                                                                         │
//! │   Sources are borrowed, never mutated. No prices are recomputed: every  │
//! │   amount is copied from the line it came from.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{aggregate, Cart, VatBreakdownEntry};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::{NewOrder, Order, OrderItem};
use crate::pricing::LineItem;
use crate::snapshot::{AddressDetails, AddressSnapshot, CustomerDetails, CustomerSnapshot};
use crate::types::{CartOwner, PaymentMethod, VatRate};
use crate::CURRENCY;

// =============================================================================
// Checkout Request
// =============================================================================

/// What the customer submits to turn a cart into an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer: CustomerDetails,
    pub shipping_address: AddressDetails,
    /// Defaults to the shipping address when absent.
    pub billing_address: Option<AddressDetails>,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
}

// =============================================================================
// Cart → Order
// =============================================================================

/// Copies every cart line into an order item, verbatim.
pub fn order_items(cart: &Cart) -> Vec<OrderItem> {
    cart.items.iter().map(OrderItem::from).collect()
}

/// Validates the checkout and builds the order snapshot.
///
/// ## Fails Fast
/// Nothing is returned unless every required piece is present: at least
/// one line, a well-formed customer email and complete addresses.
/// A cart owned by a signed-in customer attributes the order to that
/// customer; a different `customerId` in the request is rejected.
/// Totals are folded again from the copied items rather than trusting the
/// cart's cached summary.
pub fn build_new_order(cart: &Cart, request: &CheckoutRequest) -> CoreResult<NewOrder> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let customer = CustomerSnapshot::capture(&CustomerDetails {
        customer_id: order_customer_id(cart, &request.customer)?,
        ..request.customer.clone()
    })?;
    let shipping_address = AddressSnapshot::capture("shippingAddress", &request.shipping_address)?;
    let billing_address = match &request.billing_address {
        Some(billing) => AddressSnapshot::capture("billingAddress", billing)?,
        None => shipping_address.clone(),
    };

    let items = order_items(cart);
    let summary = aggregate(&items);

    Ok(NewOrder {
        cart_id: cart.id.clone(),
        customer,
        items,
        shipping_address,
        billing_address,
        summary,
        payment_method: request.payment_method,
        payment_reference: request
            .payment_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    })
}

/// The cart owner wins over the submitted id; session carts keep whatever
/// was submitted.
fn order_customer_id(cart: &Cart, customer: &CustomerDetails) -> CoreResult<Option<i64>> {
    match (&cart.owner, customer.customer_id) {
        (CartOwner::Customer(owner), Some(submitted)) if *owner != submitted => {
            Err(ValidationError::InvalidFormat {
                field: "customer.customerId".to_string(),
                reason: format!("cart belongs to customer {}", owner),
            }
            .into())
        }
        (CartOwner::Customer(owner), _) => Ok(Some(*owner)),
        (CartOwner::Session(_), submitted) => Ok(submitted),
    }
}

// =============================================================================
// Cart → Payment Gateway
// =============================================================================

/// A line as the hosted payment page expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLineItem {
    pub name: String,
    pub description: Option<String>,
    /// Tax-inclusive unit price in cents.
    pub price: i64,
    pub quantity: i64,
    pub currency: String,
}

/// Maps cart lines to payment-gateway lines.
///
/// Money is already held in cents, so the gateway price is the unit TTC
/// value as-is: €19.99 is sent as `1999`, never `1998` or `2000`.
pub fn payment_items(items: &[LineItem]) -> Vec<PaymentLineItem> {
    items
        .iter()
        .map(|item| PaymentLineItem {
            name: item.product_name.clone(),
            description: Some(format!("VAT {} included", item.vat_rate)),
            price: item.unit_price_ttc.cents(),
            quantity: item.quantity,
            currency: CURRENCY.to_string(),
        })
        .collect()
}

// =============================================================================
// Order → Confirmation Email
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EmailLineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
    pub vat_rate: VatRate,
}

/// Display data for the order confirmation email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmationEmail {
    pub order_id: String,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Vec<String>,
    pub billing_address: Vec<String>,
    pub items: Vec<EmailLineItem>,
    pub total_ht: Money,
    pub total_vat: Money,
    pub total_ttc: Money,
    pub vat_breakdown: Vec<VatBreakdownEntry>,
    pub payment_method: PaymentMethod,
}

/// Maps a persisted order to confirmation email data. Pure pass-through.
pub fn email_confirmation(order: &Order) -> OrderConfirmationEmail {
    let totals = order.summary.totals;

    OrderConfirmationEmail {
        order_id: order.id.clone(),
        order_date: order.created_at,
        customer_name: order.customer.full_name(),
        customer_email: order.customer.email().to_string(),
        shipping_address: order.shipping_address.lines(),
        billing_address: order.billing_address.lines(),
        items: order
            .items
            .iter()
            .map(|item| EmailLineItem {
                name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price_ttc,
                total_price: item.total_price_ttc,
                vat_rate: item.vat_rate,
            })
            .collect(),
        total_ht: totals.total_ht,
        total_vat: totals.total_vat,
        total_ttc: totals.total_ttc,
        vat_breakdown: order.summary.vat_breakdown.clone(),
        payment_method: order.payment_method,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
