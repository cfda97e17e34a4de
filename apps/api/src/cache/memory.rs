use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, ResponseCache};

/// Process-local cache. Entries are lost on restart.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Instant, Value)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((expires_at, value)) if Instant::now() < *expires_at => {
                    return Ok(Some(value.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // expired: drop it under the write lock
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // expired entries go on every write, not only when their key is read
        entries.retain(|_, (expires_at, _)| now < *expires_at);
        entries.insert(key.to_string(), (now + ttl, value.clone()));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .put("octocat", &json!({"n": 1}), Duration::from_secs(86_400))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(86_399)).await;
        assert!(cache.get("octocat").await.unwrap().is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("octocat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.put("a", &json!(1), ttl).await.unwrap();
        cache.put("b", &json!(2), ttl).await.unwrap();
        assert!(cache.invalidate("a").await.unwrap());
        assert!(!cache.invalidate("missing").await.unwrap());
        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(cache.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.put("a", &json!("old"), ttl).await.unwrap();
        cache.put("a", &json!("new"), ttl).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(json!("new")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_expired_entries() {
        let cache = MemoryCache::new();
        cache.put("stale", &json!(1), Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.put("fresh", &json!(2), Duration::from_secs(10)).await.unwrap();

        let entries = cache.entries.read().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("fresh"));
    }
}
