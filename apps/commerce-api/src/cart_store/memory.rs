//! Process-local cart store for tests and single-node development.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use boutique_core::Cart;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CartStore, StoreResult};

struct StoredCart {
    cart: Cart,
    expires_at: Instant,
}

impl StoredCart {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory [`CartStore`]. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryCartStore {
    carts: RwLock<HashMap<String, StoredCart>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        MemoryCartStore::default()
    }

    /// Number of live carts.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.carts.read().await.values().filter(|c| c.is_live(now)).count()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Cart>> {
        let now = Instant::now();
        let carts = self.carts.read().await;
        Ok(carts
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.cart.clone()))
    }

    async fn set(&self, key: &str, cart: &Cart, ttl: Duration) -> StoreResult<()> {
        let stored = StoredCart {
            cart: cart.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.carts.write().await.insert(key.to_string(), stored);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        cart: &Cart,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let now = Instant::now();
        let mut carts = self.carts.write().await;

        let current = carts
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.cart.version);
        if current != expected {
            return Ok(false);
        }

        carts.insert(
            key.to_string(),
            StoredCart {
                cart: cart.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let removed = self.carts.write().await.remove(key);
        Ok(removed.is_some_and(|stored| stored.is_live(now)))
    }

    async fn compare_and_delete(&self, key: &str, expected: u64) -> StoreResult<bool> {
        let now = Instant::now();
        let mut carts = self.carts.write().await;

        let matches = carts
            .get(key)
            .is_some_and(|stored| stored.is_live(now) && stored.cart.version == expected);
        if matches {
            carts.remove(key);
        }
        Ok(matches)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
