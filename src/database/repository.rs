use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Profile, Watchlist, WatchlistItem, WatchlistWithItems};

/// Profile rows keyed by Firebase uid.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert the profile if missing, otherwise refresh its email.
    async fn upsert_email(&self, uid: &str, email: Option<&str>) -> Result<(), DatabaseError>;

    async fn find(&self, uid: &str) -> Result<Option<Profile>, DatabaseError>;

    /// Insert a new profile. `None` when one already exists for `uid`.
    async fn create(&self, uid: &str, email: Option<&str>, display_name: &str)
        -> Result<Option<Profile>, DatabaseError>;
}

/// Watchlists and their items. Only `list`, `create` and `is_owner` are
/// scoped by uid; the id-based methods trust the caller to have checked
/// ownership first (see `WatchlistService`).
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    /// Newest first, items in insertion order.
    async fn list(&self, uid: &str) -> Result<Vec<WatchlistWithItems>, DatabaseError>;

    async fn create(&self, uid: &str, name: &str) -> Result<Watchlist, DatabaseError>;

    async fn is_owner(&self, uid: &str, watchlist_id: Uuid) -> Result<bool, DatabaseError>;

    /// Adding a symbol that is already present is a no-op.
    async fn add_item(&self, watchlist_id: Uuid, symbol: &str) -> Result<(), DatabaseError>;

    /// Returns whether a row was removed.
    async fn remove_item(&self, watchlist_id: Uuid, symbol: &str) -> Result<bool, DatabaseError>;

    async fn delete(&self, watchlist_id: Uuid) -> Result<(), DatabaseError>;
}

/// PostgreSQL implementation over the externally managed `profiles`,
/// `watchlists` and `watchlist_items` tables.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct WatchlistRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    items: Json<Vec<WatchlistItem>>,
}

impl From<WatchlistRow> for WatchlistWithItems {
    fn from(row: WatchlistRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            items: row.items.0,
        }
    }
}

#[async_trait]
impl ProfileRepository for PgRepository {
    async fn upsert_email(&self, uid: &str, email: Option<&str>) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (firebase_uid, email, created_at, updated_at)
            VALUES ($1, $2, now(), now())
            ON CONFLICT (firebase_uid) DO UPDATE SET email = excluded.email
            "#,
        )
        .bind(uid)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, uid: &str) -> Result<Option<Profile>, DatabaseError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT firebase_uid, email, display_name, created_at, updated_at FROM profiles WHERE firebase_uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn create(
        &self,
        uid: &str,
        email: Option<&str>,
        display_name: &str,
    ) -> Result<Option<Profile>, DatabaseError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (firebase_uid, email, display_name, created_at, updated_at)
            VALUES ($1, $2, $3, now(), now())
            ON CONFLICT (firebase_uid) DO NOTHING
            RETURNING firebase_uid, email, display_name, created_at, updated_at
            "#,
        )
        .bind(uid)
        .bind(email)
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }
}

#[async_trait]
impl WatchlistRepository for PgRepository {
    async fn list(&self, uid: &str) -> Result<Vec<WatchlistWithItems>, DatabaseError> {
        let rows = sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT w.id, w.name, w.created_at,
                   coalesce(
                     json_agg(json_build_object('symbol', wi.symbol, 'added_at', wi.added_at)
                              ORDER BY wi.added_at)
                     FILTER (WHERE wi.symbol IS NOT NULL),
                     '[]'
                   ) AS items
            FROM watchlists w
            LEFT JOIN watchlist_items wi ON wi.watchlist_id = w.id
            WHERE w.firebase_uid = $1
            GROUP BY w.id
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WatchlistWithItems::from).collect())
    }

    async fn create(&self, uid: &str, name: &str) -> Result<Watchlist, DatabaseError> {
        let watchlist = sqlx::query_as::<_, Watchlist>(
            r#"
            INSERT INTO watchlists (id, firebase_uid, name, created_at)
            VALUES ($1, $2, $3, now())
            RETURNING id, firebase_uid, name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(uid)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(watchlist)
    }

    async fn is_owner(&self, uid: &str, watchlist_id: Uuid) -> Result<bool, DatabaseError> {
        let found: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM watchlists WHERE id = $1 AND firebase_uid = $2")
                .bind(watchlist_id)
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn add_item(&self, watchlist_id: Uuid, symbol: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO watchlist_items (watchlist_id, symbol, added_at)
            VALUES ($1, $2, now())
            ON CONFLICT (watchlist_id, symbol) DO NOTHING
            "#,
        )
        .bind(watchlist_id)
        .bind(symbol)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, watchlist_id: Uuid, symbol: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM watchlist_items WHERE watchlist_id = $1 AND symbol = $2")
            .bind(watchlist_id)
            .bind(symbol)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, watchlist_id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM watchlist_items WHERE watchlist_id = $1")
            .bind(watchlist_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM watchlists WHERE id = $1")
            .bind(watchlist_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
