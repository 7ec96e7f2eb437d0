use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::auth::{FirebaseVerifier, TokenVerifier};
use crate::cache::{CacheStore, MemoryCache, PgCacheStore, SymbolCache};
use crate::config::{AppConfig, CacheBackend};
use crate::database::{DatabaseError, DatabaseManager, PgRepository};
use crate::services::summary_service::SUMMARY_NAMESPACE;
use crate::services::quote_service::QUOTE_NAMESPACE;
use crate::services::{ChatService, QuoteService, SummaryService, WatchlistService};
use crate::upstream::{LanguageModel, MarketData, OpenAiClient, PolygonClient};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Everything a handler may need, built once at startup and cloned per
/// request. All members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub verifier: Arc<dyn TokenVerifier>,
    pub summaries: SummaryService,
    pub quotes: QuoteService,
    pub chat: ChatService,
    pub watchlists: WatchlistService,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let pool = DatabaseManager::connect_lazy(&config.database)?;

        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .user_agent(concat!("stonklytics-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let verifier = FirebaseVerifier::from_config(&config.auth, http.clone());

        let store: Arc<dyn CacheStore> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Postgres => Arc::new(PgCacheStore::new(pool.clone())),
        };
        tracing::info!("Using {:?} cache backend", config.cache.backend);

        let market: Arc<dyn MarketData> = Arc::new(PolygonClient::new(
            http.clone(),
            config.upstream.polygon_base_url.clone(),
            config.upstream.polygon_api_key.clone(),
        ));
        let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(
            http,
            config.upstream.openai_base_url.clone(),
            config.upstream.openai_api_key.clone(),
            config.upstream.openai_model.clone(),
        ));
        if config.upstream.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; summaries will use fallbacks");
        }

        let repository = Arc::new(PgRepository::new(pool.clone()));

        Ok(Self {
            summaries: SummaryService::new(
                Arc::clone(&market),
                Arc::clone(&llm),
                SymbolCache::new(Arc::clone(&store), SUMMARY_NAMESPACE, config.summary_ttl()),
            ),
            quotes: QuoteService::new(market, SymbolCache::new(store, QUOTE_NAMESPACE, config.quote_ttl())),
            chat: ChatService::new(llm),
            watchlists: WatchlistService::new(repository.clone(), repository),
            verifier,
            pool,
            config: Arc::new(config),
        })
    }
}
