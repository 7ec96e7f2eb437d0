use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::services::{PriceHistory, QuoteResponse};
use crate::state::AppState;
use crate::types::parse_flag;

const DEFAULT_HISTORY_DAYS: i64 = 30;
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

#[derive(Debug, Deserialize)]
pub struct StockDataQuery {
    pub ticker: Option<String>,
    pub force: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /api/stock/data?ticker=X - quote snapshot, cached for an hour
pub async fn stock_data_get(
    State(state): State<AppState>,
    Query(query): Query<StockDataQuery>,
) -> ApiResult<Json<QuoteResponse>> {
    let ticker = query
        .ticker
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Ticker symbol is required"))?;

    let quote = state.quotes.quote(ticker, parse_flag(query.force.as_deref())).await?;
    Ok(Json(quote.into()))
}

/// GET /api/stock/:symbol/history?from=YYYY-MM-DD&to=YYYY-MM-DD - daily bars
///
/// `to` defaults to today and `from` to 30 days before `to`.
pub async fn stock_history_get(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<PriceHistory>> {
    let to = match query.to.as_deref() {
        Some(raw) => parse_date("to", raw)?,
        None => Utc::now().date_naive(),
    };
    let from = match query.from.as_deref() {
        Some(raw) => parse_date("from", raw)?,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_HISTORY_DAYS))
            .filter(|d| d.year() >= MIN_YEAR)
            .ok_or_else(|| ApiError::bad_request("to is too early for the default range"))?,
    };
    if from > to {
        return Err(ApiError::bad_request("from must not be after to"));
    }

    let history = state.quotes.history(&symbol, from, to).await?;
    Ok(Json(history))
}

fn parse_date(field: &str, raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .filter(|d| (MIN_YEAR..=MAX_YEAR).contains(&d.year()))
        .ok_or_else(|| ApiError::bad_request(format!("{} must be a date in YYYY-MM-DD format", field)))
}
