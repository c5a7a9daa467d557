//! # Error Types
//!
//! Domain-specific error types for boutique-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  boutique-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  boutique-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  commerce-api errors (in app)                                          │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → 400/404/409            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary errors are never clamped away: an invalid quantity or VAT rate
//! aborts the operation before any total is produced.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Product exists but is not for sale.
    #[error("Product {0} is not available for sale")]
    ProductInactive(i64),

    /// Quantity below 1.
    ///
    /// ## User Workflow
    /// ```text
    /// PUT /carts/{key}/items/42 { quantity: -1 }
    ///      │
    ///      ▼
    /// price_from_ht(.., -1, ..)
    ///      │
    ///      ▼
    /// InvalidQuantity { quantity: -1 } ──► 400
    /// ```
    #[error("Invalid quantity {quantity}: must be at least 1")]
    InvalidQuantity { quantity: i64 },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// VAT rate outside 0–100%.
    #[error("Invalid VAT rate {bps} bps: must be between 0 and 10000")]
    InvalidVatRate { bps: u32 },

    /// Cart has exceeded maximum allowed distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Product is not a line of the cart.
    #[error("Product {product_id} is not in the cart")]
    ItemNotInCart { product_id: i64 },

    /// Checkout attempted on a cart without items.
    #[error("Cart is empty")]
    EmptyCart,

    /// Credit note references a product the order does not contain.
    #[error("Product {product_id} is not part of order {order_id}")]
    ItemNotInOrder { order_id: String, product_id: i64 },

    /// Credited quantity would exceed what was ordered.
    #[error(
        "Cannot credit {requested} of product {product_id}: ordered {ordered}, already credited {already_credited}"
    )]
    CreditExceedsOrder {
        product_id: i64,
        ordered: i64,
        already_credited: i64,
        requested: i64,
    },

    /// Every order line has already been credited.
    #[error("Order {0} has nothing left to credit")]
    NothingToCredit(String),

    /// Credit note is not in a state that allows the operation.
    #[error("Credit note {credit_note_id} is {current_status}, cannot perform operation")]
    InvalidCreditNoteStatus {
        credit_note_id: String,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before business logic runs, usually while building a snapshot.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid email, invalid amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidQuantity { quantity: 0 };
        assert_eq!(err.to_string(), "Invalid quantity 0: must be at least 1");

        let err = CoreError::CreditExceedsOrder {
            product_id: 7,
            ordered: 2,
            already_credited: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Cannot credit 2 of product 7: ordered 2, already credited 1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("email").to_string(), "email is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "name must be at most 200 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("email").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
