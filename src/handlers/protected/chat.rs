use axum::{body::Bytes, extract::State, Extension, Json};

use crate::error::ApiResult;
use crate::handlers::parse_body;
use crate::middleware::AuthContext;
use crate::services::{ChatReply, ChatRequest, MarketNews};
use crate::state::AppState;

/// POST /api/chat - `{message, history?, watchlist?}` → `{message, role: "model"}`
pub async fn chat_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Bytes,
) -> ApiResult<Json<ChatReply>> {
    let request: ChatRequest = parse_body(&body)?;
    tracing::debug!("Chat turn from {} ({} history entries)", auth.uid, request.history.len());
    Ok(Json(state.chat.chat(request).await?))
}

/// GET /api/market-news - AI-written headlines, not cached
pub async fn market_news_get(State(state): State<AppState>) -> ApiResult<Json<MarketNews>> {
    Ok(Json(state.chat.market_news().await?))
}
