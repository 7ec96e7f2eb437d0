// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::services::{ChatError, SummaryError, WatchlistError};
use crate::upstream::UpstreamError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized: no usable bearer credential
    AuthMissing(String),

    // 401 Unauthorized: verifier rejected the credential
    AuthInvalid(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error: token verifier never initialized
    AuthBackendUnavailable(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway: upstream vendor failed and nothing can stand in for it
    UpstreamGenerationFailed(String),

    // 502 Bad Gateway: not even a degraded answer could be built
    FallbackConstructionFailed(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::AuthMissing(_) => 401,
            ApiError::AuthInvalid(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::AuthBackendUnavailable(_) => 500,
            ApiError::InternalServerError(_) => 500,
            ApiError::UpstreamGenerationFailed(_) => 502,
            ApiError::FallbackConstructionFailed(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::AuthMissing(msg) => msg,
            ApiError::AuthInvalid(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::AuthBackendUnavailable(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::UpstreamGenerationFailed(msg) => msg,
            ApiError::FallbackConstructionFailed(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::AuthMissing(_) => "AUTH_MISSING",
            ApiError::AuthInvalid(_) => "AUTH_INVALID",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::AuthBackendUnavailable(_) => "AUTH_BACKEND_UNAVAILABLE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::UpstreamGenerationFailed(_) => "UPSTREAM_GENERATION_FAILED",
            ApiError::FallbackConstructionFailed(_) => "FALLBACK_CONSTRUCTION_FAILED",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn auth_missing(message: impl Into<String>) -> Self {
        ApiError::AuthMissing(message.into())
    }

    pub fn auth_invalid(message: impl Into<String>) -> Self {
        ApiError::AuthInvalid(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn auth_backend_unavailable(message: impl Into<String>) -> Self {
        ApiError::AuthBackendUnavailable(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn upstream_generation_failed(message: impl Into<String>) -> Self {
        ApiError::UpstreamGenerationFailed(message.into())
    }

    pub fn fallback_construction_failed(message: impl Into<String>) -> Self {
        ApiError::FallbackConstructionFailed(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::Unavailable(_) => {
                tracing::error!("Database unavailable: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        // Details stay in the log
        tracing::warn!("Upstream failure: {}", err);
        ApiError::upstream_generation_failed("Upstream service unavailable")
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        ApiError::fallback_construction_failed(err.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => ApiError::bad_request(err.to_string()),
            ChatError::Upstream(e) => e.into(),
        }
    }
}

impl From<WatchlistError> for ApiError {
    fn from(err: WatchlistError) -> Self {
        match err {
            WatchlistError::Validation(msg) => ApiError::bad_request(msg),
            WatchlistError::NotFound => ApiError::not_found(err.to_string()),
            WatchlistError::Database(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
