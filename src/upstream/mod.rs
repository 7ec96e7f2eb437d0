// upstream/mod.rs - adapters for the vendor APIs this service proxies
//
// Every adapter sits behind a trait so handlers and services can be driven
// by fakes in tests, and every adapter reports failure as an `UpstreamError`
// value rather than panicking or logging-and-continuing on its own.

pub mod llm;
pub mod polygon;

use thiserror::Error;
use url::Url;

pub use llm::{ChatMessage, CompletionRequest, LanguageModel, OpenAiClient, Role};
pub use polygon::{Bar, MarketData, PolygonClient, TickerDetails};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Invalid upstream request: {0}")]
    InvalidInput(String),

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    #[error("Upstream returned no usable data")]
    Empty,
}

/// The request URL is dropped from the message; Polygon takes its key as a
/// query parameter.
impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return UpstreamError::Status(status.as_u16());
        }
        let err = err.without_url();
        if err.is_decode() {
            return UpstreamError::Malformed(err.to_string());
        }
        UpstreamError::Transport(err.to_string())
    }
}

/// Append path segments to a base URL, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, UpstreamError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| UpstreamError::InvalidInput(format!("cannot extend base url {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_handles_trailing_slash_and_encoding() {
        let base = Url::parse("https://api.openai.com/v1/").unwrap();
        let url = endpoint(&base, &["chat", "completions"]).unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

        let base = Url::parse("https://api.polygon.io").unwrap();
        let url = endpoint(&base, &["v3", "reference", "tickers", "BRK/B"]).unwrap();
        assert_eq!(url.as_str(), "https://api.polygon.io/v3/reference/tickers/BRK%2FB");
    }
}
