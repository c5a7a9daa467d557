//! # Validation Module
//!
//! Input validation for the checkout core.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront (TypeScript)                                      │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: commerce-api (Rust)                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE(cart_id) on orders                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantity, VAT rate and cart-size checks return [`CoreError`] because they
//! guard monetary computation; the rest return [`ValidationError`].

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::VatRate;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted email address (RFC 5321 path limit).
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// Monetary Guards
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1 (never clamped)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## Example
/// ```rust
/// use boutique_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> CoreResult<()> {
    if qty < 1 {
        return Err(CoreError::InvalidQuantity { quantity: qty });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: qty,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a VAT rate lies within 0–100%.
pub fn validate_vat_rate(rate: VatRate) -> CoreResult<()> {
    if !rate.is_valid() {
        return Err(CoreError::InvalidVatRate { bps: rate.bps() });
    }

    Ok(())
}

/// Validates a unit price is non-negative. Zero is allowed (free items).
pub fn validate_price(price: Money, field: &str) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the number of distinct lines before adding another one.
pub fn validate_cart_size(current_items: usize) -> CoreResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field and its maximum length.
///
/// ## Example
/// ```rust
/// use boutique_core::validation::validate_required_text;
///
/// assert!(validate_required_text("city", "Brussels", 100).is_ok());
/// assert!(validate_required_text("city", "   ", 100).is_err());
/// ```
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a customer email address.
///
/// ## Rules
/// - Must not be empty
/// - Exactly one `@`, non-empty local part, dotted domain
/// - No whitespace, at most 254 characters
///
/// ## Example
/// ```rust
/// use boutique_core::validation::validate_email;
///
/// assert!(validate_email("marie@example.be").is_ok());
/// assert!(validate_email("").is_err());
/// assert!(validate_email("marie@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (cart, order and credit note identifiers).
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(matches!(
            validate_quantity(0),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            validate_quantity(-3),
            Err(CoreError::InvalidQuantity { quantity: -3 })
        ));
        assert!(matches!(
            validate_quantity(1000),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
    }

    #[test]
    fn test_validate_vat_rate() {
        assert!(validate_vat_rate(VatRate::zero()).is_ok());
        assert!(validate_vat_rate(VatRate::from_percent(100)).is_ok());
        assert!(matches!(
            validate_vat_rate(VatRate::from_bps(10_001)),
            Err(CoreError::InvalidVatRate { bps: 10_001 })
        ));
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero(), "price").is_ok());
        assert!(validate_price(Money::from_cents(1099), "price").is_ok());
        assert!(validate_price(Money::from_cents(-1), "price").is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("marie.dupont@example.be").is_ok());
        assert!(validate_email(" marie@example.be ").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("marie").is_err());
        assert!(validate_email("@example.be").is_err());
        assert!(validate_email("marie@@example.be").is_err());
        assert!(validate_email("marie@example.").is_err());
        assert!(validate_email("ma rie@example.be").is_err());
    }

    #[test]
    fn test_validate_required_text() {
        assert!(validate_required_text("street", "Rue Neuve 1", 200).is_ok());
        assert!(validate_required_text("street", "", 200).is_err());
        assert!(validate_required_text("street", &"A".repeat(201), 200).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }
}
