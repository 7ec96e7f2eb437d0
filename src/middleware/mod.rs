pub mod auth;

pub use auth::{firebase_auth_middleware, AuthContext};
