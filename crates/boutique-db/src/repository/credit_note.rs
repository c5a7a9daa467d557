//! # Credit Note Repository
//!
//! Persists credit notes against orders and tracks how much of each order
//! line has been credited so far.

use std::collections::HashMap;

use boutique_core::cart::aggregate;
use boutique_core::credit_note::{CreditNote, CreditNoteItem, CreditNoteStatus, NewCreditNote};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{LineRow, LINE_COLUMNS};
use crate::error::{DbError, DbResult};

impl From<LineRow> for CreditNoteItem {
    fn from(line: LineRow) -> Self {
        CreditNoteItem {
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

#[derive(Debug, Clone)]
pub struct CreditNoteRepository {
    pool: SqlitePool,
}

impl CreditNoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CreditNoteRepository { pool }
    }

    /// Writes a pending credit note and its items in one transaction.
    pub async fn create(&self, mut new_note: NewCreditNote) -> DbResult<CreditNote> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        new_note.summary = aggregate(&new_note.items);
        let totals = new_note.summary.totals;

        debug!(
            credit_note_id = %id,
            order_id = %new_note.order_id,
            total_ttc = %totals.total_ttc,
            "Creating credit note"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO credit_notes (
                id, order_id, reason, status,
                total_ht_cents, total_vat_cents, total_ttc_cents,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(&new_note.order_id)
        .bind(&new_note.reason)
        .bind(CreditNoteStatus::Pending)
        .bind(totals.total_ht.cents())
        .bind(totals.total_vat.cents())
        .bind(totals.total_ttc.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, item) in new_note.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO credit_note_items (
                    credit_note_id, position, product_id, product_name, quantity,
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

        info!(credit_note_id = %id, order_id = %new_note.order_id, "Credit note created");

        Ok(CreditNote::from_new(id, new_note, now))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CreditNote>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, reason, status, created_at, refunded_at
            FROM credit_notes
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.note_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    /// Lists an order's credit notes, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<CreditNote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, reason, status, created_at, refunded_at
            FROM credit_notes
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut notes = Vec::with_capacity(rows.len());
        for row in &rows {
            notes.push(self.note_from_row(row).await?);
        }
        Ok(notes)
    }

    /// Product id → quantity already credited on earlier notes for an order.
    pub async fn credited_quantities(&self, order_id: &str) -> DbResult<HashMap<i64, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT i.product_id AS product_id, SUM(i.quantity) AS credited
            FROM credit_note_items i
            JOIN credit_notes n ON n.id = i.credit_note_id
            WHERE n.order_id = ?1
            GROUP BY i.product_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DbResult<(i64, i64)> {
                Ok((row.try_get("product_id")?, row.try_get("credited")?))
            })
            .collect()
    }

    /// Moves a note from `pending` to `refunded`.
    ///
    /// Returns `false` when the note was not pending (missing or already
    /// refunded); the update never touches a refunded note.
    pub async fn mark_refunded(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE credit_notes SET
                status = ?2,
                refunded_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(id)
        .bind(CreditNoteStatus::Refunded)
        .bind(Utc::now())
        .bind(CreditNoteStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_items(&self, credit_note_id: &str) -> DbResult<Vec<CreditNoteItem>> {
        let sql = format!(
            "SELECT {} FROM credit_note_items WHERE credit_note_id = ?1 ORDER BY position",
            LINE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(credit_note_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| LineRow::from_row(row, "credit_note_items").map(CreditNoteItem::from))
            .collect()
    }

    async fn note_from_row(&self, row: &SqliteRow) -> DbResult<CreditNote> {
        let id: String = row.try_get("id")?;
        let items = self.get_items(&id).await?;
        if items.is_empty() {
            return Err(DbError::corrupt("credit_notes", format!("credit note {} has no items", id)));
        }

        Ok(CreditNote {
            order_id: row.try_get("order_id")?,
            reason: row.try_get("reason")?,
            status: row.try_get("status")?,
            summary: aggregate(&items),
            items,
            created_at: row.try_get("created_at")?,
            refunded_at: row.try_get("refunded_at")?,
            id,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use boutique_core::credit_note::{build_credit_note, CreditLineRequest, CreditPolicy};
    use boutique_core::order::Order;

    use crate::repository::order::tests::new_order;
    use crate::{Database, DbConfig};

    async fn setup() -> (Database, Order) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = db.orders().create_order(new_order()).await.unwrap();
        (db, order)
    }

    #[tokio::test]
    async fn test_create_and_list_credit_notes() {
        let (db, order) = setup().await;
        let repo = db.credit_notes();

        let lines = [CreditLineRequest { product_id: 1, quantity: 1 }];
        let new_note =
            build_credit_note(&order, &lines, &HashMap::new(), "Damaged", CreditPolicy::Strict).unwrap();
        let created = repo.create(new_note).await.unwrap();

        let listed = repo.list_for_order(&order.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].status, CreditNoteStatus::Pending);
        assert_eq!(listed[0].total_amount_ttc().cents(), 1210);
    }

    #[tokio::test]
    async fn test_credited_quantities_accumulate() {
        let (db, order) = setup().await;
        let repo = db.credit_notes();

        for _ in 0..2 {
            let lines = [CreditLineRequest { product_id: 2, quantity: 1 }];
            let already = repo.credited_quantities(&order.id).await.unwrap();
            let note = build_credit_note(&order, &lines, &already, "Return", CreditPolicy::Strict).unwrap();
            repo.create(note).await.unwrap();
        }

        let credited = repo.credited_quantities(&order.id).await.unwrap();
        assert_eq!(credited.get(&2), Some(&2));
        assert_eq!(credited.get(&1), None);
    }

    #[tokio::test]
    async fn test_mark_refunded_only_once() {
        let (db, order) = setup().await;
        let repo = db.credit_notes();
        let note = build_credit_note(&order, &[], &HashMap::new(), "Cancelled", CreditPolicy::Strict).unwrap();
        let created = repo.create(note).await.unwrap();

        assert!(repo.mark_refunded(&created.id).await.unwrap());
        assert!(!repo.mark_refunded(&created.id).await.unwrap());

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, CreditNoteStatus::Refunded);
        assert!(fetched.refunded_at.is_some());
    }

    #[tokio::test]
    async fn test_credit_note_for_unknown_order_fails() {
        let (db, order) = setup().await;
        let mut note = build_credit_note(&order, &[], &HashMap::new(), "Return", CreditPolicy::Strict).unwrap();
        note.order_id = "missing".to_string();

        assert!(matches!(
            db.credit_notes().create(note).await,
            Err(DbError::ForeignKeyViolation { .. })
        ));
    }
}
