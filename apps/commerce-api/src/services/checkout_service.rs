//! Checkout: payment session creation and cart → order conversion.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  complete_checkout(key, request)                                        │
//! │                                                                         │
//! │  1. load cart ─────────── none / empty ──► 404, nothing written         │
//! │  2. build_new_order ───── invalid input ─► 400, nothing written         │
//! │  3. create_order (one transaction)                                      │
//! │        └─ cart already ordered ─────────► 409, nothing written          │
//! │  4. release cart ──────── failure logged, order stands                  │
//! │  5. publish OrderCreated ─ email failure logged, order stands           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The order row is committed before the cart is touched or any email is
//! sent. A retry after step 3 finds no cart and gets a 404; a retry that
//! races step 4 hits the UNIQUE cart id and gets a 409. Either way only one
//! order exists per cart.
//!
//! Releasing the cart is version-guarded. If a cart edit lands between
//! step 1 and step 4, the cart is not deleted: whatever the order did not
//! take stays behind in a fresh cart under the same key.

use std::sync::Arc;
use std::time::Duration;

use boutique_core::checkout::{build_new_order, payment_items, CheckoutRequest};
use boutique_core::events::DomainEvent;
use boutique_core::order::Order;
use boutique_core::snapshot::{CustomerDetails, CustomerSnapshot};
use boutique_core::{Cart, CoreError};
use boutique_db::{Database, CART_ID_UNIQUE_FIELD};
use tracing::{info, warn};

use crate::cart_store::{CartStore, StoreResult};
use crate::config::PaymentConfig;
use crate::error::{ApiError, ApiResult};
use crate::events::EventRegistry;
use crate::gateways::{PaymentGateway, PaymentSession, PaymentSessionRequest};
use crate::services::cart_service::cart_key;

/// Compare-and-set rounds spent carrying over lines added during checkout.
const RELEASE_ATTEMPTS: u32 = 5;

pub struct CheckoutService {
    db: Database,
    store: Arc<dyn CartStore>,
    payment: Arc<dyn PaymentGateway>,
    events: Arc<EventRegistry>,
    ttl: Duration,
    success_url: String,
    cancel_url: String,
}

impl CheckoutService {
    pub fn new(
        db: Database,
        store: Arc<dyn CartStore>,
        payment: Arc<dyn PaymentGateway>,
        events: Arc<EventRegistry>,
        ttl: Duration,
        payment_config: &PaymentConfig,
    ) -> Self {
        CheckoutService {
            db,
            store,
            payment,
            events,
            ttl,
            success_url: payment_config.success_url.clone(),
            cancel_url: payment_config.cancel_url.clone(),
        }
    }

    /// Opens a payment session for the cart's current lines.
    pub async fn start_payment(&self, raw_key: &str, customer: &CustomerDetails) -> ApiResult<PaymentSession> {
        let (_, key) = cart_key(raw_key)?;
        let cart = self.load_checkout_cart(&key).await?;
        let customer = CustomerSnapshot::capture(customer)?;

        let request = PaymentSessionRequest {
            client_reference_id: cart.id.clone(),
            customer_email: customer.email().to_string(),
            customer_name: customer.full_name(),
            line_items: payment_items(&cart.items),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
        };

        let session = self.payment.create_session(&request).await?;
        info!(
            cart_key = %key,
            cart_id = %cart.id,
            session_id = %session.session_id,
            total_ttc = %cart.summary.totals.total_ttc,
            "Payment started"
        );
        Ok(session)
    }

    /// Turns the cart into a persisted order, then clears the cart.
    pub async fn complete_checkout(&self, raw_key: &str, request: &CheckoutRequest) -> ApiResult<Order> {
        let (_, key) = cart_key(raw_key)?;
        let cart = self.load_checkout_cart(&key).await?;

        let new_order = build_new_order(&cart, request)?;

        let order = self.db.orders().create_order(new_order).await.map_err(|e| {
            if e.is_unique_violation_on(CART_ID_UNIQUE_FIELD) {
                warn!(cart_key = %key, cart_id = %cart.id, "Checkout repeated for an ordered cart");
                ApiError::conflict(format!("Cart {} has already been checked out", cart.id))
            } else {
                ApiError::from(e)
            }
        })?;

        info!(
            order_id = %order.id,
            cart_key = %key,
            total_ttc = %order.total_amount_ttc(),
            "Order created"
        );

        if let Err(e) = self.release_cart(&key, &cart, &order).await {
            warn!(cart_key = %key, order_id = %order.id, error = %e, "Order created but cart could not be cleared");
        }

        self.events.publish(&DomainEvent::order_created(order.clone())).await;

        Ok(order)
    }

    /// Deletes the checked-out cart, unless it changed since it was read.
    ///
    /// A changed cart is replaced by its remainder: the lines (or extra
    /// quantities) the order does not contain, under a new cart id.
    async fn release_cart(&self, key: &str, checked_out: &Cart, order: &Order) -> StoreResult<()> {
        if self.store.compare_and_delete(key, checked_out.version).await? {
            return Ok(());
        }

        for _ in 0..RELEASE_ATTEMPTS {
            let current = match self.store.get(key).await? {
                Some(current) if current.id == checked_out.id => current,
                // gone or already replaced by another cart
                _ => return Ok(()),
            };

            let remainder = current.remainder_after(&order.items);
            let released = if remainder.is_empty() {
                self.store.compare_and_delete(key, current.version).await?
            } else {
                self.store
                    .compare_and_set(key, Some(current.version), &remainder, self.ttl)
                    .await?
            };

            if released {
                info!(
                    cart_key = %key,
                    order_id = %order.id,
                    kept_lines = remainder.items.len(),
                    "Cart changed during checkout, unordered lines kept"
                );
                return Ok(());
            }
        }

        warn!(cart_key = %key, order_id = %order.id, "Cart kept changing during checkout, left as is");
        Ok(())
    }

    async fn load_checkout_cart(&self, key: &str) -> ApiResult<Cart> {
        let cart = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| ApiError::not_found("Cart", key))?;

        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        Ok(cart)
    }
}
