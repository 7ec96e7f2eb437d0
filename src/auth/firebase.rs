use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use url::Url;

use super::{TokenVerifier, UnconfiguredVerifier, VerifiedClaims, VerifyError};
use crate::config::AuthConfig;

const DEFAULT_KEYS_TTL: Duration = Duration::from_secs(3600);
const MIN_KEYS_TTL: Duration = Duration::from_secs(300);
const MAX_KEYS_TTL: Duration = Duration::from_secs(86400);
/// Unknown key ids inside this window after a fetch are rejected without refetching.
const KID_MISS_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Claims carried by a Firebase ID token.
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

/// Only the field we need out of a service-account JSON document.
#[derive(Debug, Deserialize)]
struct ServiceAccount {
    project_id: String,
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Firebase is not configured. Set FIREBASE_CRED_PATH (or FIREBASE_CREDENTIALS_JSON) or set GOOGLE_CLOUD_PROJECT / FIREBASE_PROJECT_ID.")]
    NotConfigured,

    #[error("Failed to read service account file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("Invalid service account JSON: {0}")]
    InvalidJson(String),
}

/// Resolve the Firebase project id, trying in order: the service account file
/// named by `FIREBASE_CRED_PATH`, raw JSON from `FIREBASE_CREDENTIALS_JSON`,
/// `firebase-service-account.json` in the working directory, and finally an
/// explicit project id.
pub fn resolve_project_id(config: &AuthConfig) -> Result<String, CredentialsError> {
    if let Some(path) = config.credentials_path.as_deref() {
        if Path::new(path).exists() {
            return project_id_from_file(path);
        }
        tracing::warn!("FIREBASE_CRED_PATH points at missing file {}", path);
    }

    if let Some(raw) = config.credentials_json.as_deref() {
        return project_id_from_json(raw);
    }

    if Path::new(&config.default_credentials_file).exists() {
        return project_id_from_file(&config.default_credentials_file);
    }

    config.project_id.clone().ok_or(CredentialsError::NotConfigured)
}

fn project_id_from_file(path: &str) -> Result<String, CredentialsError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CredentialsError::Unreadable {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    project_id_from_json(&raw)
}

fn project_id_from_json(raw: &str) -> Result<String, CredentialsError> {
    let account: ServiceAccount =
        serde_json::from_str(raw).map_err(|e| CredentialsError::InvalidJson(e.to_string()))?;
    if account.project_id.trim().is_empty() {
        return Err(CredentialsError::InvalidJson("project_id is empty".to_string()));
    }
    Ok(account.project_id)
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Verifies Firebase ID tokens against Google's published signing keys.
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: Url,
    http: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>, jwks_url: Url, http: reqwest::Client) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url,
            http,
            keys: RwLock::new(None),
        }
    }

    /// One-time setup at process start. When no credentials can be found the
    /// returned verifier rejects every token with `VerifyError::Unavailable`.
    pub fn from_config(config: &AuthConfig, http: reqwest::Client) -> Arc<dyn TokenVerifier> {
        match resolve_project_id(config) {
            Ok(project_id) => {
                tracing::info!("Firebase token verification enabled for project {}", project_id);
                Arc::new(Self::new(project_id, config.jwks_url.clone(), http))
            }
            Err(e) => {
                tracing::warn!("Firebase token verification disabled: {}", e);
                Arc::new(UnconfiguredVerifier::new(e.to_string()))
            }
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        {
            let cached = self.keys.read().await;
            if let Some(entry) = cached.as_ref() {
                let now = Instant::now();
                if entry.expires_at > now {
                    if let Some(jwk) = entry.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk)
                            .map_err(|e| VerifyError::KeySet(e.to_string()));
                    }
                    if now < entry.fetched_at + KID_MISS_REFETCH_INTERVAL {
                        return Err(unknown_kid(kid));
                    }
                }
            }
        }

        // Expired, never fetched, or the key rotated since the last fetch
        let fresh = self.fetch_keys().await?;
        let key = fresh
            .keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| VerifyError::KeySet(e.to_string()))?;
        *self.keys.write().await = Some(fresh);

        key.ok_or_else(|| unknown_kid(kid))
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, VerifyError> {
        let response = self
            .http
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| VerifyError::KeySet(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerifyError::KeySet(format!("status {}", response.status())));
        }

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .map(|ttl| ttl.clamp(MIN_KEYS_TTL, MAX_KEYS_TTL))
            .unwrap_or(DEFAULT_KEYS_TTL);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::KeySet(e.to_string()))?;

        tracing::debug!("Fetched {} Firebase signing keys, cached for {:?}", keys.keys.len(), ttl);
        let fetched_at = Instant::now();
        Ok(CachedKeys {
            keys,
            fetched_at,
            expires_at: fetched_at + ttl,
        })
    }
}

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedClaims, VerifyError> {
        let header = decode_header(token).map_err(|e| VerifyError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::InvalidToken("missing key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<FirebaseClaims>(token, &key, &self.validation()).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            _ => VerifyError::InvalidToken(e.to_string()),
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(VerifyError::InvalidToken("empty subject".to_string()));
        }

        Ok(VerifiedClaims {
            subject_id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            display_name: claims.name,
        })
    }
}

fn unknown_kid(kid: &str) -> VerifyError {
    VerifyError::InvalidToken(format!("unknown key id '{}'", kid))
}

/// Extract `max-age` from a Cache-Control header value.
fn parse_max_age(header: &str) -> Option<Duration> {
    header
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::firebase::{
        sign_token, spawn_counting_jwks_server, spawn_jwks_server, TEST_KID, TEST_PROJECT,
    };
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn http() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    fn valid_claims() -> serde_json::Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "sub": "uid-123",
            "aud": TEST_PROJECT,
            "iss": format!("https://securetoken.google.com/{}", TEST_PROJECT),
            "iat": now,
            "exp": now + 3600,
            "email": "trader@example.com",
            "email_verified": true,
            "name": "Trader Joe"
        })
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            credentials_path: None,
            credentials_json: None,
            default_credentials_file: "definitely-missing-service-account.json".to_string(),
            project_id: None,
            jwks_url: Url::parse("http://127.0.0.1:9/keys").unwrap(),
        }
    }

    #[tokio::test]
    async fn verifies_well_formed_token() {
        let jwks = spawn_jwks_server().await;
        let verifier = FirebaseVerifier::new(TEST_PROJECT, jwks, http());

        let claims = verifier.verify(&sign_token(TEST_KID, &valid_claims())).await.unwrap();
        assert_eq!(claims.subject_id, "uid-123");
        assert_eq!(claims.email.as_deref(), Some("trader@example.com"));
        assert!(claims.email_verified);
        assert_eq!(claims.display_name.as_deref(), Some("Trader Joe"));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let jwks = spawn_jwks_server().await;
        let verifier = FirebaseVerifier::new(TEST_PROJECT, jwks, http());

        let mut claims = valid_claims();
        claims["exp"] = json!(chrono::Utc::now().timestamp() - 3600);
        let err = verifier.verify(&sign_token(TEST_KID, &claims)).await.unwrap_err();
        assert_eq!(err, VerifyError::Expired);
    }

    #[tokio::test]
    async fn rejects_token_for_other_project() {
        let jwks = spawn_jwks_server().await;
        let verifier = FirebaseVerifier::new(TEST_PROJECT, jwks, http());

        let mut claims = valid_claims();
        claims["aud"] = json!("someone-elses-project");
        let err = verifier.verify(&sign_token(TEST_KID, &claims)).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_key_id() {
        let jwks = spawn_jwks_server().await;
        let verifier = FirebaseVerifier::new(TEST_PROJECT, jwks, http());

        let err = verifier.verify(&sign_token("rotated-away", &valid_claims())).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidToken(msg) if msg.contains("rotated-away")));
    }

    #[tokio::test]
    async fn unknown_key_ids_do_not_refetch_within_interval() {
        let (jwks, hits) = spawn_counting_jwks_server().await;
        let verifier = FirebaseVerifier::new(TEST_PROJECT, jwks, http());

        verifier.verify(&sign_token(TEST_KID, &valid_claims())).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        for kid in ["forged-1", "forged-2", "forged-3"] {
            let err = verifier.verify(&sign_token(kid, &valid_claims())).await.unwrap_err();
            assert!(matches!(err, VerifyError::InvalidToken(msg) if msg.contains(kid)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        verifier.verify(&sign_token(TEST_KID, &valid_claims())).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let verifier = FirebaseVerifier::new(TEST_PROJECT, auth_config().jwks_url, http());
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn unreachable_key_server_is_a_client_facing_failure() {
        let verifier = FirebaseVerifier::new(TEST_PROJECT, auth_config().jwks_url, http());
        let err = verifier.verify(&sign_token(TEST_KID, &valid_claims())).await.unwrap_err();
        assert!(matches!(err, VerifyError::KeySet(_)));
        assert!(!err.is_backend_unavailable());
    }

    #[test]
    fn project_id_from_inline_credentials() {
        let mut config = auth_config();
        config.credentials_json = Some(r#"{"type":"service_account","project_id":"stonk-prod"}"#.to_string());
        config.project_id = Some("ignored".to_string());
        assert_eq!(resolve_project_id(&config).unwrap(), "stonk-prod");
    }

    #[test]
    fn project_id_falls_back_to_explicit_setting() {
        let mut config = auth_config();
        config.credentials_path = Some("/nonexistent/firebase.json".to_string());
        config.project_id = Some("stonk-dev".to_string());
        assert_eq!(resolve_project_id(&config).unwrap(), "stonk-dev");
    }

    #[test]
    fn missing_credentials_is_not_configured() {
        assert!(matches!(
            resolve_project_id(&auth_config()),
            Err(CredentialsError::NotConfigured)
        ));
    }

    #[test]
    fn malformed_inline_credentials_are_reported() {
        let mut config = auth_config();
        config.credentials_json = Some("{not json".to_string());
        assert!(matches!(resolve_project_id(&config), Err(CredentialsError::InvalidJson(_))));
    }

    #[test]
    fn parses_max_age_directive() {
        assert_eq!(
            parse_max_age("public, max-age=19204, must-revalidate, no-transform"),
            Some(Duration::from_secs(19204))
        );
        assert_eq!(parse_max_age("no-cache"), None);
    }
}
