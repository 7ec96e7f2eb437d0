use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::SymbolCache;
use crate::types::{Provenance, Sourced, Symbol};
use crate::upstream::{Bar, MarketData, UpstreamError};

use super::read_through::read_through;

pub const QUOTE_NAMESPACE: &str = "quote";

/// Latest known market snapshot for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub ticker: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// Response body of `GET /api/stock/data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub snapshot: QuoteSnapshot,
    pub source: Provenance,
}

impl From<Sourced<QuoteSnapshot>> for QuoteResponse {
    fn from(sourced: Sourced<QuoteSnapshot>) -> Self {
        Self {
            snapshot: sourced.value,
            source: sourced.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    pub ticker: Symbol,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub bars: Vec<Bar>,
}

/// Quotes through the cache and uncached daily history.
#[derive(Clone)]
pub struct QuoteService {
    market: Arc<dyn MarketData>,
    cache: SymbolCache<QuoteSnapshot>,
}

impl QuoteService {
    pub fn new(market: Arc<dyn MarketData>, cache: SymbolCache<QuoteSnapshot>) -> Self {
        Self { market, cache }
    }

    /// There is no stand-in for a price, so vendor failure is returned as is.
    pub async fn quote(&self, raw_symbol: &str, force: bool) -> Result<Sourced<QuoteSnapshot>, UpstreamError> {
        let symbol = Symbol::normalize(raw_symbol);
        read_through(&self.cache, &symbol, force, |symbol| self.fetch_snapshot(symbol)).await
    }

    async fn fetch_snapshot(&self, symbol: Symbol) -> Result<QuoteSnapshot, UpstreamError> {
        let (details, previous) = futures::join!(
            self.market.ticker_details(&symbol),
            self.market.previous_close(&symbol)
        );

        let details = details?;
        let previous = previous.unwrap_or_else(|e| {
            tracing::warn!("Previous close unavailable for {}: {}", symbol, e);
            None
        });

        Ok(QuoteSnapshot {
            ticker: symbol.to_string(),
            name: details
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| symbol.to_string()),
            current_price: previous.as_ref().map(|bar| bar.close),
            market_cap: details.market_cap,
            volume: previous.as_ref().map(|bar| bar.volume),
            last_updated: Utc::now(),
        })
    }

    pub async fn history(&self, raw_symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<PriceHistory, UpstreamError> {
        let symbol = Symbol::normalize(raw_symbol);
        if from > to {
            return Err(UpstreamError::InvalidInput(format!("from {} is after to {}", from, to)));
        }
        let bars = self.market.daily_bars(&symbol, from, to).await?;
        Ok(PriceHistory {
            ticker: symbol,
            from,
            to,
            bars,
        })
    }
}
