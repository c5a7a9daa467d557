//! # boutique-db: Database Layer for Boutique
//!
//! Persistent storage for the catalog, orders and credit notes, backed by
//! SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Boutique Data Flow                               │
//! │                                                                         │
//! │  commerce-api service (checkout, credit notes, catalog lookup)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   boutique-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo    │    │ 001_catalog  │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo      │    │ 002_orders   │  │   │
//! │  │   │               │    │ CreditNoteRepo │    │ 003_credit.. │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (or :memory: in tests)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boutique_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./boutique.db")).await?;
//! let product = db.products().get_by_id(1).await?;
//! let order = db.orders().create_order(new_order).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::credit_note::CreditNoteRepository;
pub use repository::order::{OrderRepository, CART_ID_UNIQUE_FIELD};
pub use repository::product::{NewProduct, ProductRepository};
