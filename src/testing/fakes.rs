use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::auth::{TokenVerifier, VerifiedClaims, VerifyError};
use crate::database::models::{Profile, Watchlist, WatchlistItem, WatchlistWithItems};
use crate::database::{DatabaseError, ProfileRepository, WatchlistRepository};
use crate::types::Symbol;
use crate::upstream::{Bar, CompletionRequest, LanguageModel, MarketData, TickerDetails, UpstreamError};

enum VerifierMode {
    Accept(String),
    Reject,
    UidFromToken,
}

/// Token verifier that counts calls.
pub struct CountingVerifier {
    mode: VerifierMode,
    calls: AtomicUsize,
}

impl CountingVerifier {
    /// Every token verifies as `uid`.
    pub fn accepting(uid: &str) -> Self {
        Self::with_mode(VerifierMode::Accept(uid.to_string()))
    }

    pub fn rejecting() -> Self {
        Self::with_mode(VerifierMode::Reject)
    }

    /// The token text itself becomes the uid, for multi-user tests.
    pub fn uid_from_token() -> Self {
        Self::with_mode(VerifierMode::UidFromToken)
    }

    fn with_mode(mode: VerifierMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenVerifier for CountingVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedClaims, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let uid = match &self.mode {
            VerifierMode::Accept(uid) => uid.clone(),
            VerifierMode::UidFromToken => token.to_string(),
            VerifierMode::Reject => return Err(VerifyError::InvalidToken("bad signature".into())),
        };
        Ok(VerifiedClaims {
            email: Some(format!("{}@example.com", uid)),
            subject_id: uid,
            email_verified: true,
            display_name: None,
        })
    }
}

/// Language model with a fixed answer.
pub struct ScriptedLlm {
    reply: Result<String, UpstreamError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self::with_reply(Ok(text.to_string()))
    }

    pub fn failing(error: UpstreamError) -> Self {
        Self::with_reply(Err(error))
    }

    fn with_reply(reply: Result<String, UpstreamError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        self.reply.clone()
    }
}

/// Market data served from memory. Without details configured, lookups
/// answer 404 like the vendor does for unknown tickers.
#[derive(Default)]
pub struct FakeMarketData {
    details: Option<TickerDetails>,
    previous_close: Option<Bar>,
    bars: Vec<Bar>,
    down: bool,
    details_calls: AtomicUsize,
}

impl FakeMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails at the transport level.
    pub fn failing() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: TickerDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_previous_close(mut self, bar: Bar) -> Self {
        self.previous_close = Some(bar);
        self
    }

    pub fn with_bars(mut self, bars: Vec<Bar>) -> Self {
        self.bars = bars;
        self
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), UpstreamError> {
        if self.down {
            return Err(UpstreamError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketData for FakeMarketData {
    async fn ticker_details(&self, _symbol: &Symbol) -> Result<TickerDetails, UpstreamError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.details.clone().ok_or(UpstreamError::Status(404))
    }

    async fn previous_close(&self, _symbol: &Symbol) -> Result<Option<Bar>, UpstreamError> {
        self.check()?;
        Ok(self.previous_close.clone())
    }

    async fn daily_bars(&self, _symbol: &Symbol, _from: NaiveDate, _to: NaiveDate) -> Result<Vec<Bar>, UpstreamError> {
        self.check()?;
        Ok(self.bars.clone())
    }

    fn reference_url(&self, symbol: &Symbol) -> String {
        format!("https://api.polygon.io/v3/reference/tickers/{}", symbol)
    }
}

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    watchlists: Vec<Watchlist>,
    items: Vec<(Uuid, WatchlistItem)>,
}

/// Profiles and watchlists kept in memory, with the same semantics as the
/// PostgreSQL repository.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, uid: &str) -> Option<Profile> {
        self.tables.lock().unwrap().profiles.get(uid).cloned()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn upsert_email(&self, uid: &str, email: Option<&str>) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let profile = tables.profiles.entry(uid.to_string()).or_insert_with(|| Profile {
            firebase_uid: uid.to_string(),
            email: None,
            display_name: None,
            created_at: now,
            updated_at: now,
        });
        profile.email = email.map(str::to_string);
        Ok(())
    }

    async fn find(&self, uid: &str) -> Result<Option<Profile>, DatabaseError> {
        Ok(self.profile(uid))
    }

    async fn create(&self, uid: &str, email: Option<&str>, display_name: &str) -> Result<Option<Profile>, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.profiles.contains_key(uid) {
            return Ok(None);
        }
        let now = Utc::now();
        let profile = Profile {
            firebase_uid: uid.to_string(),
            email: email.map(str::to_string),
            display_name: Some(display_name.to_string()),
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(uid.to_string(), profile.clone());
        Ok(Some(profile))
    }
}

#[async_trait]
impl WatchlistRepository for InMemoryRepository {
    async fn list(&self, uid: &str) -> Result<Vec<WatchlistWithItems>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .watchlists
            .iter()
            .rev()
            .filter(|w| w.firebase_uid == uid)
            .map(|w| WatchlistWithItems {
                id: w.id,
                name: w.name.clone(),
                created_at: w.created_at,
                items: tables
                    .items
                    .iter()
                    .filter(|(id, _)| *id == w.id)
                    .map(|(_, item)| item.clone())
                    .collect(),
            })
            .collect())
    }

    async fn create(&self, uid: &str, name: &str) -> Result<Watchlist, DatabaseError> {
        let watchlist = Watchlist {
            id: Uuid::new_v4(),
            firebase_uid: uid.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().watchlists.push(watchlist.clone());
        Ok(watchlist)
    }

    async fn is_owner(&self, uid: &str, watchlist_id: Uuid) -> Result<bool, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.watchlists.iter().any(|w| w.id == watchlist_id && w.firebase_uid == uid))
    }

    async fn add_item(&self, watchlist_id: Uuid, symbol: &str) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.items.iter().any(|(id, item)| *id == watchlist_id && item.symbol == symbol) {
            tables.items.push((
                watchlist_id,
                WatchlistItem {
                    symbol: symbol.to_string(),
                    added_at: Utc::now(),
                },
            ));
        }
        Ok(())
    }

    async fn remove_item(&self, watchlist_id: Uuid, symbol: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.items.len();
        tables.items.retain(|(id, item)| !(*id == watchlist_id && item.symbol == symbol));
        Ok(tables.items.len() < before)
    }

    async fn delete(&self, watchlist_id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        tables.items.retain(|(id, _)| *id != watchlist_id);
        tables.watchlists.retain(|w| w.id != watchlist_id);
        Ok(())
    }
}
