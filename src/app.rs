use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::firebase_auth_middleware;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every route here sits behind the Firebase gate. `route_layer` keeps the
/// gate off unmatched paths so they still 404.
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/summary/:symbol", get(protected::summary::summary_get))
        .route("/api/stock/data", get(protected::stock::stock_data_get))
        .route("/api/stock/:symbol/history", get(protected::stock::stock_history_get))
        .route(
            "/api/watchlists",
            get(protected::watchlist::watchlists_get).post(protected::watchlist::watchlists_post),
        )
        .route("/api/watchlists/create", post(protected::watchlist::watchlists_post))
        .route("/api/watchlists/:id", delete(protected::watchlist::watchlist_delete))
        .route("/api/watchlists/:id/items", post(protected::watchlist::watchlist_item_post))
        .route(
            "/api/watchlists/:id/items/:symbol",
            delete(protected::watchlist::watchlist_item_delete),
        )
        .route("/api/signup", post(protected::profile::signup_post))
        .route("/api/profile", get(protected::profile::profile_get))
        .route("/api/chat", post(protected::chat::chat_post))
        .route("/api/market-news", get(protected::chat::market_news_get))
        .route_layer(middleware::from_fn_with_state(state, firebase_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if security.cors_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
