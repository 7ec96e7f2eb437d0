//! Local stand-in for Google's key publication: a fixed RSA key pair, a
//! JWK-set server and a token signer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{http::header::CACHE_CONTROL, routing::get, Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use url::Url;

use super::spawn_router;

pub const TEST_PROJECT: &str = "stonklytics-test";
pub const TEST_KID: &str = "test-key-1";

const PRIVATE_KEY_PEM: &[u8] = include_bytes!("fixtures/firebase_test_key.pem");
const MODULUS: &str = include_str!("fixtures/firebase_test_key.n");

/// Sign `claims` with the fixture key, advertising `kid` in the header.
pub fn sign_token(kid: &str, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Serve the fixture public key as a JWK set. Returns the key set URL.
pub async fn spawn_jwks_server() -> Url {
    spawn_counting_jwks_server().await.0
}

/// Like [`spawn_jwks_server`], also counting key set requests.
pub async fn spawn_counting_jwks_server() -> (Url, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new().route(
        "/keys",
        get(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                (
                    [(CACHE_CONTROL, "public, max-age=19800, must-revalidate, no-transform")],
                    Json(json!({
                        "keys": [{
                            "kty": "RSA",
                            "kid": TEST_KID,
                            "alg": "RS256",
                            "use": "sig",
                            "n": MODULUS.trim(),
                            "e": "AQAB"
                        }]
                    })),
                )
            }
        }),
    );
    (spawn_router(router).await.join("keys").unwrap(), hits)
}
