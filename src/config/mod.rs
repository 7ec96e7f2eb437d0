use std::env;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub summary_ttl_secs: u64,
    pub quote_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Applies to every outbound call: JWK set, LLM and market data.
    pub timeout_secs: u64,
    pub polygon_api_key: Option<String>,
    pub polygon_base_url: Url,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Url,
    pub openai_model: String,
}

/// Where the Firebase project id may come from. Resolution order lives in
/// `auth::firebase::resolve_project_id`.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub credentials_path: Option<String>,
    pub credentials_json: Option<String>,
    pub default_credentials_file: String,
    pub project_id: Option<String>,
    pub jwks_url: Url,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("STONK_API_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("STONK_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Cache overrides
        if let Ok(v) = env::var("CACHE_BACKEND") {
            self.cache.backend = match v.to_ascii_lowercase().as_str() {
                "postgres" | "database" | "db" => CacheBackend::Postgres,
                "memory" | "local" => CacheBackend::Memory,
                other => {
                    tracing::warn!("Unknown CACHE_BACKEND '{}', keeping {:?}", other, self.cache.backend);
                    self.cache.backend
                }
            };
        }
        if let Ok(v) = env::var("CACHE_SUMMARY_TTL_SECS") {
            self.cache.summary_ttl_secs = v.parse().unwrap_or(self.cache.summary_ttl_secs);
        }
        if let Ok(v) = env::var("CACHE_QUOTE_TTL_SECS") {
            self.cache.quote_ttl_secs = v.parse().unwrap_or(self.cache.quote_ttl_secs);
        }

        // Upstream overrides
        if let Ok(v) = env::var("UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = v.parse().unwrap_or(self.upstream.timeout_secs);
        }
        if let Ok(v) = env::var("POLYGON_API_KEY") {
            self.upstream.polygon_api_key = non_empty(v);
        }
        if let Ok(v) = env::var("POLYGON_BASE_URL") {
            self.upstream.polygon_base_url = Url::parse(&v).unwrap_or(self.upstream.polygon_base_url);
        }
        if let Ok(v) = env::var("OPENAI_API_KEY") {
            self.upstream.openai_api_key = non_empty(v);
        }
        if let Ok(v) = env::var("OPENAI_BASE_URL") {
            self.upstream.openai_base_url = Url::parse(&v).unwrap_or(self.upstream.openai_base_url);
        }
        if let Ok(v) = env::var("OPENAI_MODEL") {
            self.upstream.openai_model = v;
        }

        // Auth overrides
        if let Ok(v) = env::var("FIREBASE_CRED_PATH") {
            self.auth.credentials_path = non_empty(v);
        }
        if let Ok(v) = env::var("FIREBASE_CREDENTIALS_JSON") {
            self.auth.credentials_json = non_empty(v);
        }
        if let Some(v) = env::var("GOOGLE_CLOUD_PROJECT")
            .ok()
            .or_else(|| env::var("FIREBASE_PROJECT_ID").ok())
        {
            self.auth.project_id = non_empty(v);
        }
        if let Ok(v) = env::var("FIREBASE_JWKS_URL") {
            self.auth.jwks_url = Url::parse(&v).unwrap_or(self.auth.jwks_url);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            cache: CacheConfig {
                backend: CacheBackend::Memory,
                summary_ttl_secs: 30 * 60,
                quote_ttl_secs: 60 * 60,
            },
            upstream: UpstreamConfig::defaults(8),
            auth: AuthConfig::defaults(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            cache: CacheConfig {
                backend: CacheBackend::Postgres,
                summary_ttl_secs: 30 * 60,
                quote_ttl_secs: 60 * 60,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.stonklytics.app".to_string()],
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            cache: CacheConfig {
                backend: CacheBackend::Postgres,
                summary_ttl_secs: 30 * 60,
                quote_ttl_secs: 60 * 60,
            },
            upstream: UpstreamConfig::defaults(5),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://stonklytics.app".to_string()],
            },
            ..Self::development()
        }
    }

    pub fn summary_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.summary_ttl_secs)
    }

    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.quote_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }
}

impl UpstreamConfig {
    fn defaults(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            polygon_api_key: None,
            polygon_base_url: Url::parse("https://api.polygon.io").expect("static url"),
            openai_api_key: None,
            openai_base_url: Url::parse("https://api.openai.com/v1/").expect("static url"),
            openai_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl AuthConfig {
    fn defaults() -> Self {
        Self {
            credentials_path: None,
            credentials_json: None,
            default_credentials_file: "firebase-service-account.json".to_string(),
            project_id: None,
            jwks_url: Url::parse(GOOGLE_JWKS_URL).expect("static url"),
        }
    }
}

fn non_empty(v: String) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.summary_ttl(), Duration::from_secs(1800));
        assert!(config.upstream.timeout_secs < 10);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.cache.backend, CacheBackend::Postgres);
        assert_eq!(config.quote_ttl(), Duration::from_secs(3600));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(5));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn blank_secrets_are_treated_as_unset() {
        assert_eq!(non_empty("   ".to_string()), None);
        assert_eq!(non_empty(" key ".to_string()), Some("key".to_string()));
    }
}
