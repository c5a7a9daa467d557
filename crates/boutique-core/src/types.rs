//! # Domain Types
//!
//! Shared value types used throughout Boutique.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ CatalogProduct  │   │    VatRate      │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │   │  bps (u32)      │   │  Card           │       │
//! │  │  name           │   │  2100 = 21%     │   │  Bancontact     │       │
//! │  │  price_ht_cents │   │  550  = 5.5%    │   │  BankTransfer   │       │
//! │  │  vat_rate_bps   │   └─────────────────┘   │  Paypal         │       │
//! │  │  is_active      │                         └─────────────────┘       │
//! │  └─────────────────┘   ┌─────────────────┐                             │
//! │                        │   CartOwner     │                             │
//! │                        │  Session / Cust │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart, order and credit note types live in their own modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

/// Largest valid VAT rate in basis points (100%).
pub const MAX_VAT_RATE_BPS: u32 = 10_000;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. Every rate used in practice (21%, 12%, 6%, 5.5%,
/// 2.1%) is an exact integer number of basis points, so breakdown buckets
/// can key on the rate without float comparisons.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct VatRate(u32);

impl VatRate {
    /// Creates a VAT rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    /// Creates a VAT rate from a whole percentage (`21` → 21%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        VatRate(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whether the rate lies within 0–100%.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= MAX_VAT_RATE_BPS
    }
}

/// Formats as a percentage: `21%`, `5.5%`, `2.25%`.
impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let fraction = self.0 % 100;
        if fraction == 0 {
            write!(f, "{}%", whole)
        } else if fraction % 10 == 0 {
            write!(f, "{}.{}%", whole, fraction / 10)
        } else {
            write!(f, "{}.{:02}%", whole, fraction)
        }
    }
}

/// Parses a percentage string ("21", "5.5", "5.50", "21%").
impl FromStr for VatRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "vat_rate".to_string(),
            reason: "expected a percentage like 21 or 5.5".to_string(),
        };

        let s = s.trim().trim_end_matches('%').trim();
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));

        if whole.is_empty()
            || fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u32 = whole.parse().map_err(|_| invalid())?;
        let fraction: u32 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u32>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(fraction))
            .map(VatRate)
            .ok_or_else(invalid)
    }
}

// =============================================================================
// Catalog Product
// =============================================================================

/// A product as supplied by the catalog at add-to-cart time.
///
/// The cart snapshots `name`, price and rate from this record and never
/// reads it again for the same line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Tax-exclusive unit price in cents.
    pub price_ht_cents: i64,
    /// VAT rate in basis points (2100 = 21%).
    pub vat_rate_bps: u32,
    /// Inactive products cannot be added to a cart.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CatalogProduct {
    #[inline]
    pub fn price_ht(&self) -> Money {
        Money::from_cents(self.price_ht_cents)
    }

    #[inline]
    pub fn vat_rate(&self) -> VatRate {
        VatRate::from_bps(self.vat_rate_bps)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment through the hosted checkout.
    Card,
    /// Bancontact through the hosted checkout.
    Bancontact,
    /// Manual bank transfer.
    BankTransfer,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Bancontact => "bancontact",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Cart Owner
// =============================================================================

/// Who a cart belongs to: an anonymous session or a signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    Session(String),
    Customer(i64),
}

impl CartOwner {
    /// The cart store key for this owner (`session:abc`, `customer:42`).
    pub fn store_key(&self) -> String {
        match self {
            CartOwner::Session(id) => format!("session:{}", id),
            CartOwner::Customer(id) => format!("customer:{}", id),
        }
    }
}

impl FromStr for CartOwner {
    type Err = ValidationError;

    /// Parses a store key back into an owner. Bare keys are sessions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::required("cart key"));
        }

        match s.split_once(':') {
            Some(("customer", id)) => id
                .parse::<i64>()
                .map(CartOwner::Customer)
                .map_err(|_| ValidationError::InvalidFormat {
                    field: "cart key".to_string(),
                    reason: "customer id must be an integer".to_string(),
                }),
            Some(("session", id)) if !id.is_empty() => Ok(CartOwner::Session(id.to_string())),
            _ => Ok(CartOwner::Session(s.to_string())),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
