//! # Boutique Commerce API
//!
//! HTTP service for carts, checkout, orders and credit notes.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Commerce API Services                           │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  CartService   │  │CheckoutService │  │  OrderService              ││
//! │  │                │  │                │  │                            ││
//! │  │ • AddItem      │  │ • StartPayment │  │ • GetOrder / Confirmation  ││
//! │  │ • UpdateQty    │  │ • Complete     │  │ • MarkDelivered            ││
//! │  │ • RemoveItem   │  │                │  │ • IssueCreditNote / Refund ││
//! │  │ • Clear        │  │                │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │   SQLite     │  │ Cart store   │  │  Gateways                ││  │
//! │  │  │              │  │              │  │                          ││  │
//! │  │  │ Catalog,     │  │ Redis or     │  │ Payment sessions         ││  │
//! │  │  │ orders       │  │ in-memory    │  │ Confirmation email       ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! `commerce.toml` (or the file named by `BOUTIQUE_CONFIG`), overridden by
//! `BOUTIQUE__*` environment variables:
//! - `BOUTIQUE__HTTP_PORT` - HTTP port (default: 8080)
//! - `BOUTIQUE__DATABASE_PATH` - SQLite file (default: ./boutique.db)
//! - `BOUTIQUE__REDIS_URL` - Redis cart store; in-memory when unset
//! - `BOUTIQUE__CREDIT_POLICY` - `strict` or `allow_goodwill`
//! - `BOUTIQUE__PAYMENT__BASE_URL`, `BOUTIQUE__EMAIL__BASE_URL` - gateways

pub mod cart_store;
pub mod config;
pub mod error;
pub mod events;
pub mod gateways;
pub mod routes;
pub mod services;
pub mod state;

// Re-exports
pub use config::CommerceConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
