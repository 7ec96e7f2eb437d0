use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{VerifiedClaims, VerifyError};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, produced by [`firebase_auth_middleware`] and read by
/// handlers through `Extension<AuthContext>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
}

impl From<VerifiedClaims> for AuthContext {
    fn from(claims: VerifiedClaims) -> Self {
        Self {
            uid: claims.subject_id,
            email: claims.email,
            email_verified: claims.email_verified,
            display_name: claims.display_name,
        }
    }
}

/// Firebase authentication middleware. Rejects before the handler runs when
/// the bearer credential is missing or does not verify.
pub async fn firebase_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let claims = match state.verifier.verify(token).await {
        Ok(claims) => claims,
        Err(e) => return verify_error_response(e).into_response(),
    };

    tracing::debug!("Authenticated request for uid {}", claims.subject_id);
    request.extensions_mut().insert(AuthContext::from(claims));

    next.run(request).await
}

/// Extract the token from `Authorization: Bearer <token>`. The scheme match is
/// case-sensitive with exactly one space.
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::auth_missing("Missing token"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::auth_missing("Invalid authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(ApiError::auth_missing("Missing token")),
        None => Err(ApiError::auth_missing("Invalid authorization header format")),
    }
}

fn verify_error_response(err: VerifyError) -> ApiError {
    if err.is_backend_unavailable() {
        tracing::error!("Token verifier unavailable: {}", err);
        return ApiError::auth_backend_unavailable(err.to_string());
    }
    tracing::info!("Rejected token: {}", err);
    ApiError::auth_invalid(format!("Authentication failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_token_after_scheme() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn rejects_missing_header() {
        let err = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn scheme_is_case_sensitive() {
        for value in ["bearer abc", "BEARER abc", "Bearer  ", "Bearerabc", "Token abc", "Basic dXNlcg=="] {
            let err = extract_bearer_token(&headers(value)).unwrap_err();
            assert_eq!(err.status_code(), 401, "{value} should be rejected");
        }
    }

    #[test]
    fn verifier_errors_map_to_status() {
        assert_eq!(verify_error_response(VerifyError::Expired).status_code(), 401);
        assert_eq!(verify_error_response(VerifyError::KeySet("down".into())).status_code(), 401);
        assert_eq!(
            verify_error_response(VerifyError::Unavailable("no creds".into())).status_code(),
            500
        );
    }
}
