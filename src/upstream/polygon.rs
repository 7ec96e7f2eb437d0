use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{endpoint, UpstreamError};
use crate::types::Symbol;

/// Reference data for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TickerDetails {
    #[serde(default)]
    pub ticker: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sic_description: Option<String>,
    pub market_cap: Option<f64>,
}

/// One OHLCV aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Symbol in, structured market data out.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn ticker_details(&self, symbol: &Symbol) -> Result<TickerDetails, UpstreamError>;

    /// Previous session's bar; `None` when the vendor has nothing for it.
    async fn previous_close(&self, symbol: &Symbol) -> Result<Option<Bar>, UpstreamError>;

    async fn daily_bars(&self, symbol: &Symbol, from: NaiveDate, to: NaiveDate) -> Result<Vec<Bar>, UpstreamError>;

    /// Public (key-less) URL describing where reference data came from.
    fn reference_url(&self, symbol: &Symbol) -> String;
}

#[derive(Debug, Deserialize)]
struct TickerEnvelope {
    status: Option<String>,
    results: Option<TickerDetails>,
}

#[derive(Debug, Deserialize)]
struct AggregatesEnvelope {
    #[serde(default)]
    results: Vec<AggregateRow>,
}

#[derive(Debug, Deserialize)]
struct AggregateRow {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: f64,
    /// Milliseconds since the epoch
    t: i64,
}

impl TryFrom<AggregateRow> for Bar {
    type Error = UpstreamError;

    fn try_from(row: AggregateRow) -> Result<Self, Self::Error> {
        let timestamp = Utc
            .timestamp_millis_opt(row.t)
            .single()
            .ok_or_else(|| UpstreamError::Malformed(format!("bad timestamp {}", row.t)))?;
        Ok(Bar {
            timestamp,
            open: row.o,
            high: row.h,
            low: row.l,
            close: row.c,
            volume: row.v,
        })
    }
}

/// Polygon.io REST client.
pub struct PolygonClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl PolygonClient {
    pub fn new(http: reqwest::Client, base_url: Url, api_key: Option<String>) -> Self {
        Self { http, base_url, api_key }
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or(UpstreamError::NotConfigured("POLYGON_API_KEY"))
    }

    fn check_symbol(symbol: &Symbol) -> Result<(), UpstreamError> {
        if symbol.is_empty() {
            return Err(UpstreamError::InvalidInput("symbol is empty".to_string()));
        }
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, segments: &[&str]) -> Result<T, UpstreamError> {
        let api_key = self.api_key()?;
        let url = endpoint(&self.base_url, segments)?;
        let response = self
            .http
            .get(url)
            .query(&[("apiKey", api_key)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn aggregates(&self, segments: &[&str]) -> Result<Vec<Bar>, UpstreamError> {
        let envelope: AggregatesEnvelope = self.get_json(segments).await?;
        envelope.results.into_iter().map(Bar::try_from).collect()
    }
}

#[async_trait]
impl MarketData for PolygonClient {
    async fn ticker_details(&self, symbol: &Symbol) -> Result<TickerDetails, UpstreamError> {
        Self::check_symbol(symbol)?;
        let envelope: TickerEnvelope = self
            .get_json(&["v3", "reference", "tickers", symbol.as_str()])
            .await?;

        if envelope.status.as_deref() != Some("OK") {
            return Err(UpstreamError::Malformed(format!(
                "ticker lookup status {:?}",
                envelope.status
            )));
        }
        let mut details = envelope.results.ok_or(UpstreamError::Empty)?;
        if details.ticker.is_empty() {
            details.ticker = symbol.to_string();
        }
        Ok(details)
    }

    async fn previous_close(&self, symbol: &Symbol) -> Result<Option<Bar>, UpstreamError> {
        Self::check_symbol(symbol)?;
        let bars = self
            .aggregates(&["v2", "aggs", "ticker", symbol.as_str(), "prev"])
            .await?;
        Ok(bars.into_iter().next())
    }

    async fn daily_bars(&self, symbol: &Symbol, from: NaiveDate, to: NaiveDate) -> Result<Vec<Bar>, UpstreamError> {
        Self::check_symbol(symbol)?;
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        self.aggregates(&["v2", "aggs", "ticker", symbol.as_str(), "range", "1", "day", &from, &to])
            .await
    }

    fn reference_url(&self, symbol: &Symbol) -> String {
        endpoint(&self.base_url, &["v3", "reference", "tickers", symbol.as_str()])
            .map(String::from)
            .unwrap_or_else(|_| format!("{}v3/reference/tickers/{}", self.base_url, symbol))
    }
}
