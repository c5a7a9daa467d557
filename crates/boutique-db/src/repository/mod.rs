//! # Repository Module
//!
//! Database repository implementations for Boutique.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  commerce-api service                                                  │
//! │       │                                                                 │
//! │       │  db.orders().create_order(new_order)                           │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── create_order(&self, NewOrder)     one transaction                 │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── mark_delivered(&self, id)                                         │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked sqlx queries)                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog lookup and maintenance
//! - [`order::OrderRepository`] - Order snapshots
//! - [`credit_note::CreditNoteRepository`] - Credit notes and refunds

pub mod credit_note;
pub mod order;
pub mod product;

use boutique_core::money::Money;
use boutique_core::types::VatRate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::{DbError, DbResult};

/// Reads a basis-point column and checks it fits a valid VAT rate.
pub(crate) fn vat_rate_column(row: &SqliteRow, column: &str, table: &str) -> DbResult<VatRate> {
    let bps: i64 = row.try_get(column)?;
    u32::try_from(bps)
        .ok()
        .map(VatRate::from_bps)
        .filter(VatRate::is_valid)
        .ok_or_else(|| DbError::corrupt(table, format!("{} out of range: {}", column, bps)))
}

/// Reads a cents column as [`Money`].
pub(crate) fn money_column(row: &SqliteRow, column: &str) -> DbResult<Money> {
    Ok(Money::from_cents(row.try_get(column)?))
}

/// Columns shared by `order_items` and `credit_note_items`.
pub(crate) struct LineRow {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_ht: Money,
    pub unit_price_ttc: Money,
    pub vat_rate: VatRate,
    pub total_price_ht: Money,
    pub total_price_ttc: Money,
}

impl LineRow {
    pub fn from_row(row: &SqliteRow, table: &str) -> DbResult<Self> {
        Ok(LineRow {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            unit_price_ht: money_column(row, "unit_price_ht_cents")?,
            unit_price_ttc: money_column(row, "unit_price_ttc_cents")?,
            vat_rate: vat_rate_column(row, "vat_rate_bps", table)?,
            total_price_ht: money_column(row, "total_price_ht_cents")?,
            total_price_ttc: money_column(row, "total_price_ttc_cents")?,
        })
    }
}

pub(crate) const LINE_COLUMNS: &str = r#"
    product_id, product_name, quantity,
    unit_price_ht_cents, unit_price_ttc_cents, vat_rate_bps,
    total_price_ht_cents, total_price_ttc_cents
"#;
