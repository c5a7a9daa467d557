//! # boutique-core: Pure Checkout Logic for Boutique
//!
//! This crate holds the monetary engine of the shop: line pricing, cart
//! aggregation and the cart → order → payment/email snapshot translation.
//! Everything here is a pure function over owned data; there is no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Boutique Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │             Storefront / Backoffice (TypeScript)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP + JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          commerce-api (axum, cart store, gateways)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ boutique-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   money ──► pricing ──► cart ──► checkout ──► order            │   │
//! │  │   VatRate    LineItem    aggregate  snapshots   credit_note     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             boutique-db (SQLite via sqlx)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer cents, VAT conversion with round-half-up
//! - [`types`] - VAT rate, catalog product, payment method, cart owner
//! - [`pricing`] - Line-item calculator
//! - [`cart`] - Cart aggregate and the totals/VAT breakdown fold
//! - [`snapshot`] - Versioned customer and address snapshots
//! - [`order`] - Immutable order records
//! - [`checkout`] - Cart → order / payment / email translation
//! - [`credit_note`] - Credit notes against an order
//! - [`events`] - Domain events published by the API
//! - [`error`] / [`validation`] - Typed errors and business rules
//!
//! ## Example Usage
//!
//! ```rust
//! use boutique_core::money::Money;
//! use boutique_core::types::VatRate;
//!
//! let unit_ht = Money::from_cents(1000); // €10.00
//! let unit_ttc = unit_ht.add_vat(VatRate::from_percent(21));
//!
//! assert_eq!(unit_ttc.cents(), 1210);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod credit_note;
pub mod error;
pub mod events;
pub mod money;
pub mod order;
pub mod pricing;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{aggregate, Cart, CartSummary, CartTotals, VatBreakdownEntry};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{LineItem, LinePricing};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default cart retention window in seconds (24 hours).
pub const CART_TTL_SECS: u64 = 86_400;

/// ISO currency code sent to the payment processor.
pub const CURRENCY: &str = "eur";
