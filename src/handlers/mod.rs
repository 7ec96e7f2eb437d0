// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (Firebase ID token required, /api/*)
//
// Protected handlers receive the caller as `Extension<AuthContext>`; the
// gate in `middleware::auth` has already rejected anything unverified.

pub mod protected;
pub mod public;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Parse an optional JSON request body. An empty body reads as `{}` so
/// missing fields surface as validation errors rather than rejections.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}

/// `?force=` cache bypass flag shared by the cached endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ForceQuery {
    pub force: Option<String>,
}

impl ForceQuery {
    pub fn is_forced(&self) -> bool {
        crate::types::parse_flag(self.force.as_deref())
    }
}
