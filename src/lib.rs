pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod types;
pub mod upstream;

pub use app::app;
pub use config::AppConfig;
pub use state::AppState;

#[cfg(test)]
pub mod testing;
