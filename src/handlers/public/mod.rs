// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service banner and liveness probe. Nothing here touches caller identity.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::state::AppState;

/// GET / - service banner with the endpoint map
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Stonklytics API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health (public)",
            "summary": "/api/summary/:symbol[?force=1] (protected)",
            "stock": "/api/stock/data?ticker=X, /api/stock/:symbol/history (protected)",
            "watchlists": "/api/watchlists[/:id[/items[/:symbol]]] (protected)",
            "profile": "/api/signup, /api/profile (protected)",
            "chat": "/api/chat, /api/market-news (protected)",
        }
    }))
}

/// GET /health - 503 while the database cannot be reached
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
