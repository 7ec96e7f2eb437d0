use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Profile, Watchlist, WatchlistWithItems};
use crate::database::{DatabaseError, ProfileRepository, WatchlistRepository};
use crate::types::Symbol;

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("watchlist not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Outcome of a signup call.
#[derive(Debug, Clone, PartialEq)]
pub enum Signup {
    Created(Profile),
    Existing(Profile),
}

/// Profiles and watchlists, always scoped to the caller's Firebase uid.
#[derive(Clone)]
pub struct WatchlistService {
    profiles: Arc<dyn ProfileRepository>,
    watchlists: Arc<dyn WatchlistRepository>,
}

impl WatchlistService {
    pub fn new(profiles: Arc<dyn ProfileRepository>, watchlists: Arc<dyn WatchlistRepository>) -> Self {
        Self { profiles, watchlists }
    }

    /// Records the caller's profile as a side effect, so a first visit
    /// creates it.
    pub async fn list(&self, uid: &str, email: Option<&str>) -> Result<Vec<WatchlistWithItems>, WatchlistError> {
        self.profiles.upsert_email(uid, email).await?;
        Ok(self.watchlists.list(uid).await?)
    }

    pub async fn create(&self, uid: &str, name: &str) -> Result<Watchlist, WatchlistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WatchlistError::Validation("name is required"));
        }
        let watchlist = self.watchlists.create(uid, name).await?;
        tracing::info!("Created watchlist {} for {}", watchlist.id, uid);
        Ok(watchlist)
    }

    pub async fn delete(&self, uid: &str, watchlist_id: Uuid) -> Result<(), WatchlistError> {
        self.ensure_owner(uid, watchlist_id).await?;
        self.watchlists.delete(watchlist_id).await?;
        Ok(())
    }

    /// Returns the normalized symbol that was stored.
    pub async fn add_item(&self, uid: &str, watchlist_id: Uuid, raw_symbol: &str) -> Result<Symbol, WatchlistError> {
        let symbol = Symbol::normalize(raw_symbol);
        if symbol.is_empty() {
            return Err(WatchlistError::Validation("symbol is required"));
        }
        self.ensure_owner(uid, watchlist_id).await?;
        self.watchlists.add_item(watchlist_id, symbol.as_str()).await?;
        Ok(symbol)
    }

    pub async fn remove_item(&self, uid: &str, watchlist_id: Uuid, raw_symbol: &str) -> Result<(), WatchlistError> {
        let symbol = Symbol::normalize(raw_symbol);
        self.ensure_owner(uid, watchlist_id).await?;
        if !self.watchlists.remove_item(watchlist_id, symbol.as_str()).await? {
            tracing::debug!("{} was not on watchlist {}", symbol, watchlist_id);
        }
        Ok(())
    }

    pub async fn signup(&self, uid: &str, email: Option<&str>, display_name: &str) -> Result<Signup, WatchlistError> {
        if let Some(profile) = self.profiles.create(uid, email, display_name).await? {
            tracing::info!("Created profile for {}", uid);
            return Ok(Signup::Created(profile));
        }
        Ok(Signup::Existing(self.profile(uid).await?))
    }

    pub async fn profile(&self, uid: &str) -> Result<Profile, WatchlistError> {
        self.profiles
            .find(uid)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("profile not found".to_string()).into())
    }

    async fn ensure_owner(&self, uid: &str, watchlist_id: Uuid) -> Result<(), WatchlistError> {
        if self.watchlists.is_owner(uid, watchlist_id).await? {
            Ok(())
        } else {
            Err(WatchlistError::NotFound)
        }
    }
}
