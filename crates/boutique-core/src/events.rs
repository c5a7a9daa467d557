//! # Domain Events
//!
//! Facts published after a state change has been persisted.
//!
//! Events only describe what happened. Dispatch lives in the API's
//! `EventRegistry`; handlers must never be able to undo the change that
//! produced the event.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::order::Order;

/// Discriminant used to subscribe handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CartUpdated,
    CartCleared,
    OrderCreated,
    OrderDelivered,
    CreditNoteIssued,
    CreditNoteRefunded,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CartUpdated => "cart_updated",
            EventKind::CartCleared => "cart_cleared",
            EventKind::OrderCreated => "order_created",
            EventKind::OrderDelivered => "order_delivered",
            EventKind::CreditNoteIssued => "credit_note_issued",
            EventKind::CreditNoteRefunded => "credit_note_refunded",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    CartUpdated {
        cart_key: String,
        cart_id: String,
        version: u64,
        total_ttc: Money,
    },
    CartCleared {
        cart_key: String,
        cart_id: String,
    },
    /// Carries the full order so handlers need no extra lookup.
    OrderCreated { order: Box<Order> },
    OrderDelivered { order_id: String },
    CreditNoteIssued {
        credit_note_id: String,
        order_id: String,
        total_ttc: Money,
    },
    CreditNoteRefunded {
        credit_note_id: String,
        order_id: String,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::CartUpdated { .. } => EventKind::CartUpdated,
            DomainEvent::CartCleared { .. } => EventKind::CartCleared,
            DomainEvent::OrderCreated { .. } => EventKind::OrderCreated,
            DomainEvent::OrderDelivered { .. } => EventKind::OrderDelivered,
            DomainEvent::CreditNoteIssued { .. } => EventKind::CreditNoteIssued,
            DomainEvent::CreditNoteRefunded { .. } => EventKind::CreditNoteRefunded,
        }
    }

    pub fn order_created(order: Order) -> Self {
        DomainEvent::OrderCreated {
            order: Box::new(order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let event = DomainEvent::OrderDelivered {
            order_id: "o-1".to_string(),
        };
        assert_eq!(event.kind(), EventKind::OrderDelivered);
        assert_eq!(event.kind().to_string(), "order_delivered");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DomainEvent::CartCleared {
            cart_key: "session:abc".to_string(),
            cart_id: "c-1".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"cart_cleared\""));
    }
}
