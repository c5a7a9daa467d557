//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Converting a decimal price to cents with floats:                       │
//! │    2.675 * 100 = 267.49999999999997  → rounds to 267  ❌ WRONG!         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents end to end                                 │
//! │    Catalog, cart, order and payment gateway all carry cents (i64).      │
//! │    The gateway amount IS the stored value: nothing to convert late.     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use boutique_core::money::Money;
//! use boutique_core::types::VatRate;
//!
//! let unit_ht = Money::from_cents(1000);             // €10.00
//! let unit_ttc = unit_ht.add_vat(VatRate::from_percent(21));
//! assert_eq!(unit_ttc.cents(), 1210);                // €12.10
//!
//! let parsed: Money = "19.99".parse().unwrap();
//! assert_eq!(parsed.cents(), 1999);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::VatRate;

/// Basis points in 100%.
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (euro cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: credit notes and differences may be negative
/// - **Single field tuple struct**: serialized as a plain integer
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_ht_cents ──► LineItem.unit_price_ht ──► total_price_ht   │
/// │                                   │                                     │
/// │                                   └─► unit_price_ttc ──► total_price_ttc│
/// │                                                                         │
/// │  Cart totals ──► Order totals (frozen) ──► CreditNote totals            │
/// │                                                                         │
/// │  LineItem.unit_price_ttc ──► PaymentLineItem.price (same cents)         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use boutique_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // €10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from euros and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -€5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-euro portion.
    #[inline]
    pub const fn euros(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Converts a tax-exclusive (HT) amount to tax-inclusive (TTC).
    ///
    /// `ttc = round_half_up(ht × (10000 + bps) / 10000)`, computed in i128
    /// so nothing is lost before the single rounding step.
    ///
    /// ## Example
    /// ```rust
    /// use boutique_core::money::Money;
    /// use boutique_core::types::VatRate;
    ///
    /// let ht = Money::from_cents(999); // €9.99
    /// let ttc = ht.add_vat(VatRate::from_percent(21));
    /// // 9.99 × 1.21 = 12.0879 → €12.09
    /// assert_eq!(ttc.cents(), 1209);
    /// ```
    pub fn add_vat(&self, rate: VatRate) -> Money {
        let numerator = self.0 as i128 * (BPS_SCALE + rate.bps() as i128);
        Money::from_cents(div_round_half_up(numerator, BPS_SCALE) as i64)
    }

    /// Converts a tax-inclusive (TTC) amount back to tax-exclusive (HT).
    ///
    /// `ht = round_half_up(ttc × 10000 / (10000 + bps))`
    ///
    /// ## Example
    /// ```rust
    /// use boutique_core::money::Money;
    /// use boutique_core::types::VatRate;
    ///
    /// let ttc = Money::from_cents(1210);
    /// assert_eq!(ttc.remove_vat(VatRate::from_percent(21)).cents(), 1000);
    /// ```
    pub fn remove_vat(&self, rate: VatRate) -> Money {
        let numerator = self.0 as i128 * BPS_SCALE;
        let denominator = BPS_SCALE + rate.bps() as i128;
        Money::from_cents(div_round_half_up(numerator, denominator) as i64)
    }

    /// Multiplies money by a quantity (exact, no rounding).
    ///
    /// ## Example
    /// ```rust
    /// use boutique_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1210);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 2420);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Integer division rounding halves away from zero.
///
/// `denominator` must be positive.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    if numerator >= 0 {
        (2 * numerator + denominator) / (2 * denominator)
    } else {
        -((-2 * numerator + denominator) / (2 * denominator))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses a decimal euro amount ("19.99", "5", "0.5", "-3.10") exactly.
///
/// More than two fractional digits is rejected rather than rounded: a price
/// that cannot be expressed in cents is a data error.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number like 19.99"));
        }
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal places are allowed"));
        }

        let euros: i64 = whole.parse().map_err(|_| invalid("amount is too large"))?;
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("bad cents"))? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid("bad cents"))?,
        };

        let total = euros
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -total } else { total }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as "€12.10" (debugging and email plain text).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}€{}.{:02}", sign, self.euros().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
