use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::error::ApiResult;
use crate::handlers::ForceQuery;
use crate::middleware::AuthContext;
use crate::services::StockSummary;
use crate::state::AppState;

/// GET /api/summary/:symbol - AI outlook for a ticker
///
/// Served from cache when possible (`source: "cache"`), regenerated on a
/// miss or with `?force=1` (`"fresh"`), and degraded to a context-only
/// bullet list when the model is unavailable (`"fallback"`).
///
/// ```json
/// {
///   "symbol": "AAPL",
///   "summary": "• Apple makes phones",
///   "source": "fresh",
///   "references": [{"title": "Polygon ref data for AAPL", "url": "..."}]
/// }
/// ```
pub async fn summary_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(symbol): Path<String>,
    Query(query): Query<ForceQuery>,
) -> ApiResult<Json<StockSummary>> {
    tracing::debug!("Summary for {} requested by {}", symbol, auth.uid);
    let summary = state.summaries.summarize(&symbol, query.is_forced()).await?;
    Ok(Json(summary))
}
