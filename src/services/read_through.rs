//! Get-or-generate over a [`SymbolCache`].
//!
//! 1. Unless `force` is set, return a cached value tagged `cache`.
//! 2. Otherwise call the generator with the normalized symbol.
//! 3. A generated value is written back and tagged `fresh`.
//! 4. On generator failure, [`read_through_or_fallback`] builds a degraded
//!    value tagged `fallback`; it is returned but never cached.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::SymbolCache;
use crate::types::{Provenance, Sourced, Symbol};

/// Read through the cache, propagating generator failure to the caller.
pub async fn read_through<T, E, F, Fut>(
    cache: &SymbolCache<T>,
    symbol: &Symbol,
    force: bool,
    generate: F,
) -> Result<Sourced<T>, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(Symbol) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if !force {
        if let Some(hit) = cache.get(symbol.as_str()).await {
            tracing::debug!("Cache hit for {}", cache.key(symbol.as_str()).as_str());
            return Ok(Sourced::new(hit, Provenance::Cache));
        }
    }

    let value = generate(symbol.clone()).await?;
    cache.set(symbol.as_str(), &value).await;
    Ok(Sourced::new(value, Provenance::Fresh))
}

/// Read through the cache, substituting `fallback(err)` when the generator
/// fails. Only a failing fallback surfaces as an error.
pub async fn read_through_or_fallback<T, E, X, F, Fut, B>(
    cache: &SymbolCache<T>,
    symbol: &Symbol,
    force: bool,
    generate: F,
    fallback: B,
) -> Result<Sourced<T>, X>
where
    T: Serialize + DeserializeOwned,
    E: std::fmt::Display,
    F: FnOnce(Symbol) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: FnOnce(E) -> Result<T, X>,
{
    match read_through(cache, symbol, force, generate).await {
        Ok(sourced) => Ok(sourced),
        Err(err) => {
            tracing::warn!("Generator failed for {}, using fallback: {}", symbol, err);
            let value = fallback(err)?;
            Ok(Sourced::new(value, Provenance::Fallback))
        }
    }
}
