//! Cart service: catalog lookup plus optimistic read-modify-write against
//! the cart store.

use std::sync::Arc;
use std::time::Duration;

use boutique_core::events::DomainEvent;
use boutique_core::{Cart, CartOwner, CatalogProduct, CoreError, CoreResult};
use boutique_db::Database;
use tracing::{debug, info, warn};

use crate::cart_store::CartStore;
use crate::error::{ApiError, ApiResult};
use crate::events::EventRegistry;

/// Cart operations for one storefront.
pub struct CartService {
    db: Database,
    store: Arc<dyn CartStore>,
    events: Arc<EventRegistry>,
    ttl: Duration,
    max_attempts: u32,
}

/// Canonical store key for a path segment (`abc` → `session:abc`).
pub fn cart_key(raw: &str) -> ApiResult<(CartOwner, String)> {
    let owner: CartOwner = raw.parse()?;
    let key = owner.store_key();
    Ok((owner, key))
}

impl CartService {
    pub fn new(
        db: Database,
        store: Arc<dyn CartStore>,
        events: Arc<EventRegistry>,
        ttl: Duration,
        max_attempts: u32,
    ) -> Self {
        CartService {
            db,
            store,
            events,
            ttl,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn get_cart(&self, raw_key: &str) -> ApiResult<Cart> {
        let (_, key) = cart_key(raw_key)?;
        self.store
            .get(&key)
            .await?
            .ok_or_else(|| ApiError::not_found("Cart", &key))
    }

    /// Adds a catalog product, creating the cart on first use.
    pub async fn add_item(&self, raw_key: &str, product_id: i64, quantity: i64) -> ApiResult<Cart> {
        let product = self.lookup_product(product_id).await?;

        self.update(raw_key, true, |cart| cart.add_item(&product, quantity))
            .await
    }

    /// Sets a line's quantity; 0 removes the line.
    pub async fn update_quantity(&self, raw_key: &str, product_id: i64, quantity: i64) -> ApiResult<Cart> {
        self.update(raw_key, false, |cart| cart.update_quantity(product_id, quantity))
            .await
    }

    pub async fn remove_item(&self, raw_key: &str, product_id: i64) -> ApiResult<Cart> {
        self.update(raw_key, false, |cart| cart.remove_item(product_id).map(|_| ()))
            .await
    }

    /// Deletes the cart record.
    pub async fn clear(&self, raw_key: &str) -> ApiResult<()> {
        let (_, key) = cart_key(raw_key)?;
        let cart = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| ApiError::not_found("Cart", &key))?;

        self.store.delete(&key).await?;
        info!(cart_key = %key, cart_id = %cart.id, "Cart cleared");

        self.events
            .publish(&DomainEvent::CartCleared {
                cart_key: key,
                cart_id: cart.id,
            })
            .await;
        Ok(())
    }

    async fn lookup_product(&self, product_id: i64) -> ApiResult<CatalogProduct> {
        let product = self.db.products().get_by_id(product_id).await.map_err(|e| {
            warn!(product_id, error = %e, "Catalog lookup failed");
            ApiError::upstream("catalog service error")
        })?;

        product.ok_or_else(|| CoreError::ProductNotFound(product_id).into())
    }

    /// Applies `mutate` with compare-and-set, re-reading on contention.
    ///
    /// The mutation may run more than once, always against a fresh copy.
    async fn update<F>(&self, raw_key: &str, create_if_missing: bool, mutate: F) -> ApiResult<Cart>
    where
        F: Fn(&mut Cart) -> CoreResult<()>,
    {
        let (owner, key) = cart_key(raw_key)?;

        for attempt in 1..=self.max_attempts {
            let current = self.store.get(&key).await?;
            let expected = current.as_ref().map(|cart| cart.version);

            let mut cart = match current {
                Some(cart) => cart,
                None if create_if_missing => Cart::new(owner.clone()),
                None => return Err(ApiError::not_found("Cart", &key)),
            };

            mutate(&mut cart)?;

            if self.store.compare_and_set(&key, expected, &cart, self.ttl).await? {
                debug!(
                    cart_key = %key,
                    version = cart.version,
                    lines = cart.items.len(),
                    attempt,
                    "Cart updated"
                );

                self.events
                    .publish(&DomainEvent::CartUpdated {
                        cart_key: key,
                        cart_id: cart.id.clone(),
                        version: cart.version,
                        total_ttc: cart.summary.totals.total_ttc,
                    })
                    .await;
                return Ok(cart);
            }

            debug!(cart_key = %key, attempt, "Cart changed concurrently, retrying");
        }

        warn!(cart_key = %key, attempts = self.max_attempts, "Cart update gave up after repeated conflicts");
        Err(ApiError::conflict(format!(
            "Cart {} is being modified concurrently, please retry",
            key
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart_store::MemoryCartStore;
    use crate::error::ErrorCode;
    use crate::events::tests::RecordingHandler;
    use boutique_core::events::EventKind;
    use boutique_db::{DbConfig, NewProduct};

    const TTL: Duration = Duration::from_secs(60);

    async fn setup() -> (CartService, Database, Arc<MemoryCartStore>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = Arc::new(MemoryCartStore::new());
        let service = CartService::new(db.clone(), store.clone(), Arc::new(EventRegistry::new()), TTL, 3);
        (service, db, store)
    }

    async fn insert(db: &Database, name: &str, price_ht_cents: i64, vat_rate_bps: u32) -> i64 {
        db.products()
            .insert(&NewProduct {
                name: name.to_string(),
                description: None,
                price_ht_cents,
                vat_rate_bps,
                is_active: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_add_creates_cart_and_merges_lines() {
        let (service, db, _) = setup().await;
        let mug = insert(&db, "Mug", 1000, 2100).await;

        let cart = service.add_item("abc", mug, 1).await.unwrap();
        assert_eq!(cart.owner, CartOwner::Session("abc".to_string()));
        assert_eq!(cart.version, 1);

        let cart = service.add_item("session:abc", mug, 1).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.summary.totals.total_ttc.cents(), 2420);
    }

    #[tokio::test]
    async fn test_line_keeps_price_after_catalog_change() {
        let (service, db, _) = setup().await;
        let mug = insert(&db, "Mug", 1000, 2100).await;

        service.add_item("abc", mug, 1).await.unwrap();
        db.products().update_price(mug, 5000).await.unwrap();
        let cart = service.add_item("abc", mug, 1).await.unwrap();

        assert_eq!(cart.items[0].unit_price_ht.cents(), 1000);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (service, _, _) = setup().await;
        let err = service.add_item("abc", 404, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_quantity_leaves_store_untouched() {
        let (service, db, store) = setup().await;
        let mug = insert(&db, "Mug", 1000, 2100).await;

        let err = service.add_item("abc", mug, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_update_and_remove_need_existing_cart() {
        let (service, db, _) = setup().await;
        let mug = insert(&db, "Mug", 1000, 2100).await;

        let err = service.update_quantity("abc", mug, 2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        service.add_item("abc", mug, 1).await.unwrap();
        let cart = service.update_quantity("abc", mug, 3).await.unwrap();
        assert_eq!(cart.items[0].quantity, 3);

        let cart = service.remove_item("abc", mug).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.summary.totals.total_ttc.cents(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let (service, db, _) = setup().await;
        let service = Arc::new(service);
        let mug = insert(&db, "Mug", 1000, 2100).await;
        let tea = insert(&db, "Tea", 500, 600).await;

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.add_item("abc", mug, 1).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.add_item("abc", tea, 1).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let cart = service.get_cart("abc").await.unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.version, 2);
    }

    #[tokio::test]
    async fn test_clear_publishes_event() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let events = Arc::new(EventRegistry::new());
        let recorder = RecordingHandler::new();
        events.subscribe(EventKind::CartCleared, recorder.clone()).await;
        let service = CartService::new(db.clone(), Arc::new(MemoryCartStore::new()), events, TTL, 3);
        let mug = insert(&db, "Mug", 1000, 2100).await;

        service.add_item("abc", mug, 1).await.unwrap();
        service.clear("abc").await.unwrap();

        assert_eq!(service.get_cart("abc").await.unwrap_err().code, ErrorCode::NotFound);
        assert_eq!(recorder.kinds(), vec![EventKind::CartCleared]);
    }
}
