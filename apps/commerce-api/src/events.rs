//! # Event Registry
//!
//! Dispatches [`DomainEvent`]s to handlers subscribed at startup.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  startup           requests                          shutdown          │
//! │  ───────           ────────                          ────────          │
//! │  EventRegistry::new()                                                   │
//! │  subscribe(OrderCreated, mailer)                                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  AppState { events: Arc<EventRegistry> }                                │
//! │        │                                                                │
//! │        ├──► publish(OrderCreated) ──► mailer.handle()  (errors logged)  │
//! │        │                                                                │
//! │        └──────────────────────────────────────────────► shutdown()      │
//! │                                                         handlers dropped│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is an ordinary value owned by the application state, so
//! tests build their own with exactly the handlers they need.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use boutique_core::events::{DomainEvent, EventKind};
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Reacts to published events. Failures are logged by the registry and
/// never reach the publisher.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &DomainEvent) -> HandlerResult;
}

#[derive(Default)]
struct Subscriptions {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
    closed: bool,
}

#[derive(Default)]
pub struct EventRegistry {
    inner: RwLock<Subscriptions>,
}

impl EventRegistry {
    pub fn new() -> Self {
        EventRegistry::default()
    }

    /// Adds a handler for one kind of event. Handlers run in subscription order.
    pub async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        let mut inner = self.inner.write().await;
        if inner.closed {
            warn!(event = %kind, handler = handler.name(), "Registry is shut down, subscription ignored");
            return;
        }

        debug!(event = %kind, handler = handler.name(), "Handler subscribed");
        inner.handlers.entry(kind).or_default().push(handler);
    }

    /// Runs every handler for the event's kind, one after another.
    ///
    /// Returns how many handlers completed without error.
    pub async fn publish(&self, event: &DomainEvent) -> usize {
        let kind = event.kind();
        let handlers = {
            let inner = self.inner.read().await;
            inner.handlers.get(&kind).cloned().unwrap_or_default()
        };

        let mut succeeded = 0;
        for handler in handlers {
            match handler.handle(event).await {
                Ok(()) => succeeded += 1,
                Err(e) => warn!(event = %kind, handler = handler.name(), error = %e, "Event handler failed"),
            }
        }

        debug!(event = %kind, succeeded, "Event published");
        succeeded
    }

    pub async fn handler_count(&self, kind: EventKind) -> usize {
        self.inner.read().await.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Drops every handler. Later publishes are no-ops.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.write().await;
        inner.handlers.clear();
        inner.closed = true;
        debug!("Event registry shut down");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every event it sees; optionally fails after recording.
    pub(crate) struct RecordingHandler {
        pub seen: Mutex<Vec<EventKind>>,
        fail: bool,
    }

    impl RecordingHandler {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(RecordingHandler { seen: Mutex::new(Vec::new()), fail: false })
        }

        fn failing() -> Arc<Self> {
            Arc::new(RecordingHandler { seen: Mutex::new(Vec::new()), fail: true })
        }

        pub(crate) fn kinds(&self) -> Vec<EventKind> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn handle(&self, event: &DomainEvent) -> HandlerResult {
            self.seen.lock().unwrap().push(event.kind());
            if self.fail {
                return Err("handler failure".into());
            }
            Ok(())
        }
    }

    fn delivered() -> DomainEvent {
        DomainEvent::OrderDelivered { order_id: "o-1".to_string() }
    }

    #[tokio::test]
    async fn test_publish_reaches_only_subscribed_kind() {
        let registry = EventRegistry::new();
        let handler = RecordingHandler::new();
        registry.subscribe(EventKind::OrderDelivered, handler.clone()).await;

        assert_eq!(registry.publish(&delivered()).await, 1);
        let cleared = DomainEvent::CartCleared {
            cart_key: "session:s".to_string(),
            cart_id: "c".to_string(),
        };
        assert_eq!(registry.publish(&cleared).await, 0);

        assert_eq!(handler.kinds(), vec![EventKind::OrderDelivered]);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_the_next() {
        let registry = EventRegistry::new();
        let failing = RecordingHandler::failing();
        let after = RecordingHandler::new();
        registry.subscribe(EventKind::OrderDelivered, failing.clone()).await;
        registry.subscribe(EventKind::OrderDelivered, after.clone()).await;

        assert_eq!(registry.publish(&delivered()).await, 1);
        assert_eq!(failing.kinds().len(), 1);
        assert_eq!(after.kinds().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_detaches_handlers() {
        let registry = EventRegistry::new();
        let handler = RecordingHandler::new();
        registry.subscribe(EventKind::OrderDelivered, handler.clone()).await;

        registry.shutdown().await;
        registry.subscribe(EventKind::OrderDelivered, handler.clone()).await;

        assert_eq!(registry.handler_count(EventKind::OrderDelivered).await, 0);
        assert_eq!(registry.publish(&delivered()).await, 0);
        assert!(handler.kinds().is_empty());
    }
}
