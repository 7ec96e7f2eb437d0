//! Symbol-keyed cache in front of the expensive generators.
//!
//! Stores deal in JSON values under fully-qualified string keys; the typed
//! [`SymbolCache`] on top normalizes symbols and (de)serializes payloads.
//! Backend failures never reach callers: a failed read is a miss and a
//! failed write is logged and dropped, since every entry can be regenerated.

pub mod memory;
pub mod postgres;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::Symbol;

pub use memory::MemoryCache;
pub use postgres::PgCacheStore;

/// Fully-qualified cache key, `<namespace>:<SYMBOL>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: &str, symbol: &Symbol) -> Self {
        CacheKey(format!("{}:{}", namespace, symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A shared key/value store with per-entry expiry. Implementations provide
/// atomic per-key get/set; concurrent writers of one key are last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Stored value if present and unexpired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError>;

    /// Store `value` until now + `ttl`, replacing any existing entry.
    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError>;
}

/// Typed view over a [`CacheStore`] for one namespace.
pub struct SymbolCache<T> {
    store: Arc<dyn CacheStore>,
    namespace: &'static str,
    ttl: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for SymbolCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace,
            ttl: self.ttl,
            _payload: PhantomData,
        }
    }
}

impl<T> SymbolCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn CacheStore>, namespace: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            namespace,
            ttl,
            _payload: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(&self, symbol: &str) -> CacheKey {
        CacheKey::new(self.namespace, &Symbol::normalize(symbol))
    }

    /// Look up `symbol`. Misses, expired entries, backend errors and payloads
    /// that no longer decode all come back as `None`.
    pub async fn get(&self, symbol: &str) -> Option<T> {
        let key = self.key(symbol);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key.as_str(), e);
                return None;
            }
        };

        match serde_json::from_value(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key.as_str(), e);
                None
            }
        }
    }

    /// Store with the namespace's default TTL.
    pub async fn set(&self, symbol: &str, value: &T) {
        self.set_with_ttl(symbol, value, self.ttl).await
    }

    pub async fn set_with_ttl(&self, symbol: &str, value: &T, ttl: Duration) {
        let key = self.key(symbol);
        let result = match serde_json::to_value(value) {
            Ok(raw) => self.store.set(&key, raw, ttl).await,
            Err(e) => Err(CacheError::from(e)),
        };
        if let Err(e) = result {
            tracing::warn!("Cache write failed for {}: {}", key.as_str(), e);
        }
    }
}
