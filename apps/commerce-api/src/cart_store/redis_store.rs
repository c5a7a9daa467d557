//! Redis-backed cart store.
//!
//! Each cart is one JSON string under `cart:{key}` with `EX` set to the
//! cart TTL. Compare-and-set runs as a Lua script so the version check and
//! the write happen atomically on the server.

use std::time::Duration;

use async_trait::async_trait;
use boutique_core::Cart;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use super::{CartStore, StoreError, StoreResult};

const KEY_PREFIX: &str = "cart:";

/// ARGV[1] is the expected version ("" for "absent"), ARGV[2] the new
/// record, ARGV[3] the TTL in seconds.
const COMPARE_AND_SET_LUA: &str = r#"
local current = redis.call('GET', KEYS[1])
if current then
    if ARGV[1] == '' then
        return 0
    end
    local ok, decoded = pcall(cjson.decode, current)
    if not ok or decoded['version'] == nil then
        return 0
    end
    if string.format('%d', decoded['version']) ~= ARGV[1] then
        return 0
    end
elseif ARGV[1] ~= '' then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

/// ARGV[1] is the expected version.
const COMPARE_AND_DELETE_LUA: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
local ok, decoded = pcall(cjson.decode, current)
if not ok or decoded['version'] == nil then
    return 0
end
if string.format('%d', decoded['version']) ~= ARGV[1] then
    return 0
end
redis.call('DEL', KEYS[1])
return 1
"#;

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// [`CartStore`] over a shared Redis instance.
#[derive(Clone)]
pub struct RedisCartStore {
    conn: ConnectionManager,
    compare_and_set: Script,
    compare_and_delete: Script,
}

impl RedisCartStore {
    /// Connects to Redis. The connection manager reconnects on its own
    /// after transient failures.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!("Connected to Redis cart store");

        Ok(RedisCartStore {
            conn,
            compare_and_set: Script::new(COMPARE_AND_SET_LUA),
            compare_and_delete: Script::new(COMPARE_AND_DELETE_LUA),
        })
    }

    fn redis_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait]
impl CartStore for RedisCartStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Cart>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::redis_key(key)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, cart: &Cart, ttl: Duration) -> StoreResult<()> {
        let json = serde_json::to_string(cart)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::redis_key(key), json, Self::ttl_secs(ttl))
            .await?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        cart: &Cart,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let json = serde_json::to_string(cart)?;
        let expected = expected.map(|v| v.to_string()).unwrap_or_default();
        let mut conn = self.conn.clone();

        let written: i64 = self
            .compare_and_set
            .key(Self::redis_key(key))
            .arg(&expected)
            .arg(json)
            .arg(Self::ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await?;

        debug!(cart_key = %key, expected = %expected, written = written == 1, "Cart compare-and-set");
        Ok(written == 1)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(Self::redis_key(key)).await?;
        Ok(removed > 0)
    }

    async fn compare_and_delete(&self, key: &str, expected: u64) -> StoreResult<bool> {
        let mut conn = self.conn.clone();

        let removed: i64 = self
            .compare_and_delete
            .key(Self::redis_key(key))
            .arg(expected.to_string())
            .invoke_async(&mut conn)
            .await?;

        debug!(cart_key = %key, expected, removed = removed == 1, "Cart compare-and-delete");
        Ok(removed == 1)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
