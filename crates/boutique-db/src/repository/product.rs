//! # Product Repository
//!
//! The catalog as the cart sees it: id, name, HT price, VAT rate, active flag.
//!
//! ## Snapshot Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add to cart ──► get_by_id(42) ──► CatalogProduct ──► LineItem snapshot │
//! │                                                                         │
//! │  update_price(42, ..) later changes this table only. Carts and orders  │
//! │  keep the price they captured.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use boutique_core::types::CatalogProduct;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = r#"
    id, name, description, price_ht_cents, vat_rate_bps, is_active, created_at, updated_at
"#;

/// Fields needed to create a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_ht_cents: i64,
    pub vat_rate_bps: u32,
    pub is_active: bool,
}

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<CatalogProduct>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Lists active products by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<CatalogProduct>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1",
            PRODUCT_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(product_from_row).collect()
    }

    /// Inserts a product and returns it with its assigned id.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<CatalogProduct> {
        debug!(name = %product.name, price_ht_cents = product.price_ht_cents, "Inserting product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products (
                name, description, price_ht_cents, vat_rate_bps, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_ht_cents)
        .bind(i64::from(product.vat_rate_bps))
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id.to_string()))
    }

    /// Changes the catalog price. Existing carts and orders are unaffected.
    pub async fn update_price(&self, id: i64, price_ht_cents: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET price_ht_cents = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(price_ht_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        Ok(())
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn product_from_row(row: &SqliteRow) -> DbResult<CatalogProduct> {
    let vat_rate = super::vat_rate_column(row, "vat_rate_bps", "products")?;

    Ok(CatalogProduct {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price_ht_cents: row.try_get("price_ht_cents")?,
        vat_rate_bps: vat_rate.bps(),
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
