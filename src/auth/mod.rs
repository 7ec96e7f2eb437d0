pub mod firebase;

use async_trait::async_trait;
use thiserror::Error;

pub use firebase::FirebaseVerifier;

/// Identity resolved from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub subject_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
}

/// Why a credential could not be turned into claims.
///
/// Everything except `Unavailable` is the client's problem and maps to 401.
/// `Unavailable` means the verifier never initialized (no project or
/// service-account credentials) and is reported as an operator error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Invalid Firebase token: {0}")]
    InvalidToken(String),

    #[error("Firebase token has expired")]
    Expired,

    #[error("Firebase signing keys unavailable: {0}")]
    KeySet(String),

    #[error("Auth init error: {0}")]
    Unavailable(String),
}

impl VerifyError {
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, VerifyError::Unavailable(_))
    }
}

/// Turns a bearer token into claims. Implementations must not cache tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedClaims, VerifyError>;
}

/// Stands in for the real verifier when startup could not find credentials.
/// Every call reports the original initialization failure.
#[derive(Debug, Clone)]
pub struct UnconfiguredVerifier {
    reason: String,
}

impl UnconfiguredVerifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl TokenVerifier for UnconfiguredVerifier {
    async fn verify(&self, _token: &str) -> Result<VerifiedClaims, VerifyError> {
        Err(VerifyError::Unavailable(self.reason.clone()))
    }
}
