//! # API Error Type
//!
//! Unified error type for HTTP handlers and services.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Commerce API                       │
//! │                                                                         │
//! │  CoreError (pricing, cart, credit rules) ──┐                            │
//! │  DbError (SQLite)                        ──┤                            │
//! │  StoreError (cart store)                 ──┼──► ApiError ──► HTTP + JSON│
//! │  GatewayError (payment, email)           ──┘                            │
//! │                                                                         │
//! │  ValidationError ──► 400   NotFound ──► 404   Conflict ──► 409          │
//! │  UpstreamError   ──► 502   DatabaseError / Internal ──► 500             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! { "code": "NOT_FOUND", "message": "Cart not found: session:abc" }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use boutique_core::{CoreError, ValidationError};
use boutique_db::DbError;
use serde::Serialize;

use crate::cart_store::StoreError;
use crate::gateways::GatewayError;

/// API error returned from every handler.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code:?}] {message}")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Duplicate checkout, stale cart, credit beyond the order (409)
    Conflict,

    /// Payment processor or catalog unreachable or refused (502)
    UpstreamError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Conflict, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::UpstreamError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::UniqueViolation { field, value } => {
                ApiError::conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Corrupt { table, reason } => {
                tracing::error!(table = %table, "Corrupt row: {}", reason);
                ApiError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::ItemNotInCart { .. } | CoreError::EmptyCart => {
                ApiError::new(ErrorCode::NotFound, message)
            }
            CoreError::ProductInactive(_)
            | CoreError::InvalidQuantity { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::InvalidVatRate { .. }
            | CoreError::CartTooLarge { .. }
            | CoreError::ItemNotInOrder { .. } => ApiError::validation(message),
            CoreError::CreditExceedsOrder { .. }
            | CoreError::NothingToCredit(_)
            | CoreError::InvalidCreditNoteStatus { .. } => ApiError::conflict(message),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Cart store error: {}", err);
        match err {
            StoreError::Unavailable(_) => ApiError::internal("Cart store unavailable"),
            StoreError::Corrupt(_) => ApiError::internal("Stored cart could not be read"),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        tracing::error!(service = err.service(), "Upstream error: {}", err);
        ApiError::upstream(format!("{} service error", err.service()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::not_found("Cart", "k").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("dup").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::upstream("down").status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_core_error_mapping() {
        assert_eq!(ApiError::from(CoreError::ProductNotFound(7)).code, ErrorCode::NotFound);
        assert_eq!(ApiError::from(CoreError::ProductInactive(7)).code, ErrorCode::ValidationError);
        assert_eq!(
            ApiError::from(CoreError::InvalidQuantity { quantity: 0 }).code,
            ErrorCode::ValidationError
        );
        assert_eq!(ApiError::from(CoreError::EmptyCart).code, ErrorCode::NotFound);
        assert_eq!(
            ApiError::from(CoreError::NothingToCredit("o-1".to_string())).code,
            ErrorCode::Conflict
        );
        assert_eq!(
            ApiError::from(CoreError::Validation(ValidationError::required("email"))).code,
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_duplicate_order_is_conflict() {
        let err = ApiError::from(DbError::duplicate("orders.cart_id", "cart-1"));
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::not_found("Order", "o-1")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Order not found: o-1");
    }
}
