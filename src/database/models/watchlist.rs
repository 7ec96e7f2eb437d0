use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Watchlist {
    pub id: Uuid,
    pub firebase_uid: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub symbol: String,
    pub added_at: DateTime<Utc>,
}

/// A watchlist with its items, as listed to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistWithItems {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<WatchlistItem>,
}
