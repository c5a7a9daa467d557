//! Backoffice operations on persisted orders: delivery, credit notes and
//! refunds.

use std::sync::Arc;

use boutique_core::checkout::{email_confirmation, OrderConfirmationEmail};
use boutique_core::credit_note::{build_credit_note, CreditLineRequest, CreditNote, CreditPolicy, CreditNoteStatus};
use boutique_core::events::DomainEvent;
use boutique_core::order::Order;
use boutique_core::CoreError;
use boutique_db::Database;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::events::EventRegistry;

/// Body of a credit note request. No lines credits everything left.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreditNote {
    pub reason: String,
    #[serde(default)]
    pub lines: Vec<CreditLineRequest>,
}

pub struct OrderService {
    db: Database,
    events: Arc<EventRegistry>,
    policy: CreditPolicy,
    // Held across "read credited quantities → insert note" so two
    // concurrent notes cannot both pass the cap check.
    issue_lock: Mutex<()>,
}

impl OrderService {
    pub fn new(db: Database, events: Arc<EventRegistry>, policy: CreditPolicy) -> Self {
        OrderService {
            db,
            events,
            policy,
            issue_lock: Mutex::new(()),
        }
    }

    pub async fn get_order(&self, order_id: &str) -> ApiResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))
    }

    pub async fn confirmation(&self, order_id: &str) -> ApiResult<OrderConfirmationEmail> {
        let order = self.get_order(order_id).await?;
        Ok(email_confirmation(&order))
    }

    /// Marks an order delivered. Repeating the call returns the order unchanged.
    pub async fn mark_delivered(&self, order_id: &str) -> ApiResult<Order> {
        let order = self.get_order(order_id).await?;
        if order.delivered {
            return Ok(order);
        }

        if !self.db.orders().mark_delivered(order_id).await? {
            // a concurrent call delivered it first and publishes the event
            return self.get_order(order_id).await;
        }

        let order = self.get_order(order_id).await?;
        info!(order_id = %order.id, "Order delivered");

        self.events
            .publish(&DomainEvent::OrderDelivered {
                order_id: order.id.clone(),
            })
            .await;
        Ok(order)
    }

    pub async fn issue_credit_note(&self, order_id: &str, request: &IssueCreditNote) -> ApiResult<CreditNote> {
        let _guard = self.issue_lock.lock().await;

        let order = self.get_order(order_id).await?;
        let credit_notes = self.db.credit_notes();
        let already_credited = credit_notes.credited_quantities(order_id).await?;

        let new_note = build_credit_note(&order, &request.lines, &already_credited, &request.reason, self.policy)?;
        let note = credit_notes.create(new_note).await?;

        info!(
            credit_note_id = %note.id,
            order_id = %order.id,
            total_ttc = %note.total_amount_ttc(),
            policy = ?self.policy,
            "Credit note issued"
        );

        self.events
            .publish(&DomainEvent::CreditNoteIssued {
                credit_note_id: note.id.clone(),
                order_id: note.order_id.clone(),
                total_ttc: note.total_amount_ttc(),
            })
            .await;
        Ok(note)
    }

    pub async fn list_credit_notes(&self, order_id: &str) -> ApiResult<Vec<CreditNote>> {
        self.get_order(order_id).await?;
        Ok(self.db.credit_notes().list_for_order(order_id).await?)
    }

    /// Moves a pending credit note to refunded. Refunding twice is a conflict.
    pub async fn refund_credit_note(&self, credit_note_id: &str) -> ApiResult<CreditNote> {
        let credit_notes = self.db.credit_notes();
        let note = credit_notes
            .get_by_id(credit_note_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Credit note", credit_note_id))?;

        let not_pending = |current: CreditNoteStatus| -> ApiError {
            CoreError::InvalidCreditNoteStatus {
                credit_note_id: credit_note_id.to_string(),
                current_status: current.to_string(),
            }
            .into()
        };

        if note.status != CreditNoteStatus::Pending {
            return Err(not_pending(note.status));
        }
        // the UPDATE is guarded on `pending` too, so a concurrent refund loses there
        if !credit_notes.mark_refunded(credit_note_id).await? {
            return Err(not_pending(CreditNoteStatus::Refunded));
        }

        let note = credit_notes
            .get_by_id(credit_note_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Credit note", credit_note_id))?;

        info!(credit_note_id = %note.id, order_id = %note.order_id, "Credit note refunded");

        self.events
            .publish(&DomainEvent::CreditNoteRefunded {
                credit_note_id: note.id.clone(),
                order_id: note.order_id.clone(),
            })
            .await;
        Ok(note)
    }
}
