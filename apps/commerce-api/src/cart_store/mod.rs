//! # Cart Store
//!
//! Where live carts are kept between requests, one record per cart key.
//!
//! ## Optimistic Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request A                    store                    request B        │
//! │  ─────────                    ─────                    ─────────        │
//! │  get(k) ──────────────────►  v3  ◄──────────────────── get(k)           │
//! │  add_item → v4                                         add_item → v4    │
//! │  compare_and_set(k, 3) ───►  v4 ✓                                       │
//! │                              v4  ◄──── compare_and_set(k, 3) ✗          │
//! │                                        retry: get(k) → v4 → v5 ✓        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every [`Cart`] mutation bumps `version`, so a write that expected the
//! version it read is rejected if anyone else wrote in between. Nothing is
//! lost; the loser re-reads and re-applies its change.

pub mod memory;
pub mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use boutique_core::Cart;
use thiserror::Error;

pub use self::memory::MemoryCartStore;
pub use self::redis_store::RedisCartStore;

/// Cart store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cart store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored cart could not be decoded: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent cart storage with per-record expiry.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the cart stored under `key`, if it exists and has not expired.
    async fn get(&self, key: &str) -> StoreResult<Option<Cart>>;

    /// Unconditionally stores `cart`, resetting its expiry to `ttl`.
    async fn set(&self, key: &str, cart: &Cart, ttl: Duration) -> StoreResult<()>;

    /// Stores `cart` only if the stored version still equals `expected`.
    ///
    /// `expected == None` means "only if no cart is stored". Returns `false`
    /// when the stored record did not match.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        cart: &Cart,
        ttl: Duration,
    ) -> StoreResult<bool>;

    /// Removes the cart. Returns whether one was stored.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Removes the cart only if the stored version still equals `expected`.
    ///
    /// Returns `false`, leaving the record alone, when it is missing or was
    /// written since `expected` was read.
    async fn compare_and_delete(&self, key: &str, expected: u64) -> StoreResult<bool>;

    /// Checks the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
