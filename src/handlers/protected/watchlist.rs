use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::WatchlistWithItems;
use crate::error::{ApiError, ApiResult};
use crate::handlers::parse_body;
use crate::middleware::AuthContext;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateWatchlistBody {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddItemBody {
    pub symbol: Option<String>,
}

/// Ids that do not parse cannot belong to the caller either.
fn watchlist_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("watchlist not found"))
}

/// GET /api/watchlists - caller's watchlists, newest first
pub async fn watchlists_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<WatchlistWithItems>>> {
    let lists = state.watchlists.list(&auth.uid, auth.email.as_deref()).await?;
    Ok(Json(lists))
}

/// POST /api/watchlists - `{name}` → 201 `{id, name}`
pub async fn watchlists_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let body: CreateWatchlistBody = parse_body(&body)?;
    let watchlist = state
        .watchlists
        .create(&auth.uid, body.name.as_deref().unwrap_or_default())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": watchlist.id, "name": watchlist.name })),
    ))
}

/// DELETE /api/watchlists/:id
pub async fn watchlist_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.watchlists.delete(&auth.uid, watchlist_id(&id)?).await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /api/watchlists/:id/items - `{symbol}` → 201, duplicates are no-ops
pub async fn watchlist_item_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let id = watchlist_id(&id)?;
    let body: AddItemBody = parse_body(&body)?;
    state
        .watchlists
        .add_item(&auth.uid, id, body.symbol.as_deref().unwrap_or_default())
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

/// DELETE /api/watchlists/:id/items/:symbol
pub async fn watchlist_item_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, symbol)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    state
        .watchlists
        .remove_item(&auth.uid, watchlist_id(&id)?, &symbol)
        .await?;
    Ok(Json(json!({ "ok": true })))
}
