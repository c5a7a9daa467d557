//! # Order Repository
//!
//! Persists order snapshots and reads them back.
//!
//! ## Order Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create_order(NewOrder)                            │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    INSERT orders (.., cart_id UNIQUE, snapshots as JSON, totals)       │
//! │    INSERT order_items × N (position keeps cart order)                  │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any failure rolls back everything: there is never a header without    │
//! │  its items. A second order for the same cart fails on UNIQUE(cart_id)  │
//! │  and surfaces as DbError::UniqueViolation { field: "orders.cart_id" }. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use boutique_core::cart::{aggregate, CartSummary};
use boutique_core::order::{NewOrder, Order, OrderItem};
use boutique_core::snapshot::{AddressSnapshot, CustomerSnapshot};
use boutique_core::types::PaymentMethod;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{money_column, LineRow, LINE_COLUMNS};
use crate::error::{DbError, DbResult};

/// Field reported when a cart is checked out twice.
pub const CART_ID_UNIQUE_FIELD: &str = "orders.cart_id";

const ORDER_COLUMNS: &str = r#"
    id, cart_id, customer_id, customer_snapshot, shipping_address, billing_address,
    total_ht_cents, total_vat_cents, total_ttc_cents,
    payment_method, payment_reference, delivered, delivered_at, created_at, updated_at
"#;

impl From<LineRow> for OrderItem {
    fn from(line: LineRow) -> Self {
        OrderItem {
            product_id: line.product_id,
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price_ht: line.unit_price_ht,
            unit_price_ttc: line.unit_price_ttc,
            vat_rate: line.vat_rate,
            total_price_ht: line.total_price_ht,
            total_price_ttc: line.total_price_ttc,
        }
    }
}

/// Repository for orders and their items.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Writes an order header and its items in one transaction.
    ///
    /// The stored totals are folded from the items being written.
    pub async fn create_order(&self, mut new_order: NewOrder) -> DbResult<Order> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        new_order.summary = aggregate(&new_order.items);

        debug!(
            order_id = %id,
            cart_id = %new_order.cart_id,
            items = new_order.items.len(),
            total_ttc = %new_order.summary.totals.total_ttc,
            "Creating order"
        );

        let customer_json = new_order
            .customer
            .to_json()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let shipping_json = new_order
            .shipping_address
            .to_json()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let billing_json = new_order
            .billing_address
            .to_json()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let totals = new_order.summary.totals;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, cart_id, customer_id, customer_snapshot,
                shipping_address, billing_address,
                total_ht_cents, total_vat_cents, total_ttc_cents,
                payment_method, payment_reference, delivered,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, 0,
                ?12, ?12
            )
            "#,
        )
        .bind(&id)
        .bind(&new_order.cart_id)
        .bind(new_order.customer.customer_id())
        .bind(&customer_json)
        .bind(&shipping_json)
        .bind(&billing_json)
        .bind(totals.total_ht.cents())
        .bind(totals.total_vat.cents())
        .bind(totals.total_ttc.cents())
        .bind(new_order.payment_method)
        .bind(&new_order.payment_reference)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on(CART_ID_UNIQUE_FIELD) => {
                DbError::duplicate(CART_ID_UNIQUE_FIELD, new_order.cart_id.clone())
            }
            err => err,
        })?;

        for (position, item) in new_order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, position, product_id, product_name, quantity,
                    unit_price_ht_cents, unit_price_ttc_cents, vat_rate_bps,
                    total_price_ht_cents, total_price_ttc_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&id)
            .bind(position as i64)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price_ht.cents())
            .bind(item.unit_price_ttc.cents())
            .bind(i64::from(item.vat_rate.bps()))
            .bind(item.total_price_ht.cents())
            .bind(item.total_price_ttc.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(order_id = %id, cart_id = %new_order.cart_id, "Order created");

        Ok(Order::from_new(id, new_order, now))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(self.order_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    /// Looks up the order a cart was turned into, if any.
    pub async fn get_by_cart_id(&self, cart_id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE cart_id = ?1", ORDER_COLUMNS);
        let row = sqlx::query(&sql).bind(cart_id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(self.order_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    /// Gets the frozen items of an order, in cart order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY position",
            LINE_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(order_id).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| LineRow::from_row(row, "order_items").map(OrderItem::from))
            .collect()
    }

    /// Marks an order delivered. Delivering twice keeps the first timestamp.
    ///
    /// This is the only column of an order that changes after creation.
    /// Returns `false` when the order was missing or already delivered; only
    /// one of several concurrent callers sees `true`.
    pub async fn mark_delivered(&self, id: &str) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                delivered = 1,
                delivered_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND delivered = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(order_id = %id, "Order missing or already delivered");
        }
        Ok(result.rows_affected() == 1)
    }

    async fn order_from_row(&self, row: &SqliteRow) -> DbResult<Order> {
        let id: String = row.try_get("id")?;
        let items = self.get_items(&id).await?;

        let summary: CartSummary = aggregate(&items);
        let stored_ttc = money_column(row, "total_ttc_cents")?;
        let stored_ht = money_column(row, "total_ht_cents")?;
        if summary.totals.total_ttc != stored_ttc || summary.totals.total_ht != stored_ht {
            return Err(DbError::corrupt(
                "orders",
                format!("order {} totals do not match its items", id),
            ));
        }

        let customer_json: String = row.try_get("customer_snapshot")?;
        let shipping_json: String = row.try_get("shipping_address")?;
        let billing_json: String = row.try_get("billing_address")?;
        let payment_method: PaymentMethod = row.try_get("payment_method")?;

        Ok(Order {
            cart_id: row.try_get("cart_id")?,
            customer_id: row.try_get("customer_id")?,
            customer: CustomerSnapshot::from_json(&customer_json)
                .map_err(|e| DbError::corrupt("orders", e))?,
            shipping_address: AddressSnapshot::from_json(&shipping_json)
                .map_err(|e| DbError::corrupt("orders", e))?,
            billing_address: AddressSnapshot::from_json(&billing_json)
                .map_err(|e| DbError::corrupt("orders", e))?,
            items,
            summary,
            payment_method,
            payment_reference: row.try_get("payment_reference")?,
            delivered: row.try_get("delivered")?,
            delivered_at: row.try_get("delivered_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            id,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
