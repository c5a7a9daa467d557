//! Shared application state.
//!
//! Built once at startup and cloned into every handler. All fields are
//! cheap handles; cloning never copies carts or connections.

use std::sync::Arc;

use boutique_core::events::EventKind;
use boutique_db::Database;

use crate::cart_store::CartStore;
use crate::config::CommerceConfig;
use crate::events::EventRegistry;
use crate::gateways::{EmailSender, OrderConfirmationMailer, PaymentGateway};
use crate::services::{CartService, CheckoutService, OrderService};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: Arc<dyn CartStore>,
    pub events: Arc<EventRegistry>,
    pub carts: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    /// Wires services together and subscribes the startup event handlers.
    pub async fn build(
        config: &CommerceConfig,
        db: Database,
        store: Arc<dyn CartStore>,
        payment: Arc<dyn PaymentGateway>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        let events = Arc::new(EventRegistry::new());
        events
            .subscribe(EventKind::OrderCreated, Arc::new(OrderConfirmationMailer::new(email)))
            .await;

        let carts = CartService::new(
            db.clone(),
            store.clone(),
            events.clone(),
            config.cart_ttl(),
            config.cart_update_retries,
        );
        let checkout = CheckoutService::new(
            db.clone(),
            store.clone(),
            payment,
            events.clone(),
            config.cart_ttl(),
            &config.payment,
        );
        let orders = OrderService::new(db.clone(), events.clone(), config.credit_policy);

        AppState {
            db,
            store,
            events,
            carts: Arc::new(carts),
            checkout: Arc::new(checkout),
            orders: Arc::new(orders),
        }
    }
}
