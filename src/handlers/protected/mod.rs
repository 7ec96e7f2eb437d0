// handlers/protected/mod.rs - Protected handlers (Firebase ID token required)
//
// Security Level: bearer token verified by `middleware::auth`
// Route Prefix: /api/*
// Context: `Extension<AuthContext>` carrying the caller's Firebase uid

pub mod chat;
pub mod profile;
pub mod stock;
pub mod summary;
pub mod watchlist;
