use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, CacheKey, CacheStore};

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process cache store. Entries live until their TTL passes; expired
/// entries are dropped when read or swept on the next write.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key.as_str()) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Re-check under the write lock; a writer may have refreshed it
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key.as_str()) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key.as_str());
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.as_str().to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;
    use serde_json::json;

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new("summary", &Symbol::normalize(symbol))
    }

    #[tokio::test(start_paused = true)]
    async fn get_within_ttl_returns_value() {
        let cache = MemoryCache::new();
        cache.set(&key("AAPL"), json!("v1"), Duration::from_secs(1800)).await.unwrap();

        tokio::time::advance(Duration::from_secs(1799)).await;
        assert_eq!(cache.get(&key("AAPL")).await.unwrap(), Some(json!("v1")));
    }

    #[tokio::test(start_paused = true)]
    async fn get_after_ttl_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set(&key("AAPL"), json!("v1"), Duration::from_secs(1800)).await.unwrap();

        tokio::time::advance(Duration::from_secs(1801)).await;
        assert_eq!(cache.get(&key("AAPL")).await.unwrap(), None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_resets_expiry() {
        let cache = MemoryCache::new();
        cache.set(&key("AAPL"), json!("old"), Duration::from_secs(60)).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
        cache.set(&key("AAPL"), json!("new"), Duration::from_secs(60)).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(cache.get(&key("AAPL")).await.unwrap(), Some(json!("new")));
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_entries() {
        let cache = MemoryCache::new();
        cache.set(&key("AAPL"), json!(1), Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.set(&key("MSFT"), json!(2), Duration::from_secs(10)).await.unwrap();

        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_key_is_a_miss() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get(&key("NVDA")).await.unwrap(), None);
    }
}
