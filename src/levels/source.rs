use super::config;
use super::error::RetrievalError;
use super::models::OptionChainSnapshot;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Market-data collaborator: expiration listing and per-expiration chains
#[async_trait]
pub trait OptionsSource: Send + Sync {
    /// Expiration dates as `YYYY-MM-DD` strings, in the provider's order
    async fn list_expirations(&self, symbol: &str) -> Result<Vec<String>, RetrievalError>;

    async fn get_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChainSnapshot, RetrievalError>;
}

// -----------------------------------------------
// EXPIRATION LIST CACHE
// -----------------------------------------------

/// Caches successful expiration listings per symbol so repeated runs
/// against the same tickers reuse them. Chains are always fetched fresh.
pub struct CachingSource<S> {
    inner: S,
    ttl: Duration,
    expirations: RwLock<HashMap<String, (Vec<String>, Instant)>>,
}

impl<S: OptionsSource> CachingSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, config::EXPIRATIONS_CACHE_DURATION)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            expirations: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S: OptionsSource> OptionsSource for CachingSource<S> {
    async fn list_expirations(&self, symbol: &str) -> Result<Vec<String>, RetrievalError> {
        // Check cache first
        {
            let cache = self.expirations.read().await;
            if let Some((dates, cached_at)) = cache.get(symbol) {
                if cached_at.elapsed() < self.ttl {
                    return Ok(dates.clone());
                }
            }
        }

        let dates = self.inner.list_expirations(symbol).await?;

        {
            let mut cache = self.expirations.write().await;
            cache.insert(symbol.to_string(), (dates.clone(), Instant::now()));
        }

        Ok(dates)
    }

    async fn get_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChainSnapshot, RetrievalError> {
        self.inner.get_chain(symbol, expiration).await
    }
}
