use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;

use super::{CacheError, CacheKey, CacheStore};

/// Cache store backed by the `cache_entries` table, shared by every replica.
/// The table is provisioned outside this service (see `sql/schema.sql`).
#[derive(Clone)]
pub struct PgCacheStore {
    pool: PgPool,
}

impl PgCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let row: Option<(Value,)> = sqlx::query_as(
            "SELECT value FROM cache_entries WHERE key = $1 AND expires_at > now()",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CacheError::Backend(e.to_string()))?;
        let expires_at = Utc::now() + ttl;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key.as_str())
        .bind(&value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(())
    }
}
