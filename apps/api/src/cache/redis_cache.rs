use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde_json::Value;
use tracing::{debug, info};

use super::{sanitize_key, CacheError, ResponseCache};

const KEY_PREFIX: &str = "gitscout:analyze:";
const SCAN_BATCH: usize = 100;

/// Redis-backed cache; expiry is delegated to `SET .. EX`.
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        info!("Connected to redis cache");
        Ok(Self { conn })
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{}", sanitize_key(key))
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(key))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => {
                debug!("Cache miss for key: {key}");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(key))
            .arg(serde_json::to_string(value)?)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(Self::key(key))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{KEY_PREFIX}*");
        let mut cursor: u64 = 0;
        let mut removed = 0usize;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let n: i64 = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                removed += n as usize;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
