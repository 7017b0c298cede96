//! Exchange rate caching using Moka.
//!
//! Wraps any [`CurrencyRateProvider`] so repeated lookups of the same pair do not hit the
//! remote service. A cached rate lives at most `ttl` and is dropped earlier when it has not
//! been read for `idle`.

use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use tracing::debug;
use tripper_shared::types::CurrencyCode;

use super::rate::{CurrencyRateProvider, RateError};

/// Default cache capacity (number of currency pairs).
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Default absolute time-to-live (30 minutes).
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default idle expiry (10 minutes).
const DEFAULT_IDLE: Duration = Duration::from_secs(10 * 60);

/// Caching decorator for a rate provider.
///
/// Keyed by the ordered `(from, to)` pair. Failed lookups are never cached, and concurrent
/// misses for the same pair share a single inner lookup.
pub struct CachedRateProvider<P> {
    inner: P,
    cache: Cache<(CurrencyCode, CurrencyCode), Decimal>,
}

impl<P: CurrencyRateProvider> CachedRateProvider<P> {
    /// Wraps `inner` with the default capacity and expiry settings.
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self::with_config(inner, DEFAULT_CACHE_CAPACITY, DEFAULT_TTL, DEFAULT_IDLE)
    }

    /// Wraps `inner` with custom settings.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of currency pairs to keep
    /// * `ttl` - Absolute lifetime of an entry
    /// * `idle` - Lifetime of an entry since it was last read
    #[must_use]
    pub fn with_config(inner: P, max_capacity: u64, ttl: Duration, idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .time_to_idle(idle)
            .build();

        Self { inner, cache }
    }

    /// Returns the wrapped provider.
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    #[cfg(test)]
    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    #[cfg(test)]
    async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl<P: CurrencyRateProvider> CurrencyRateProvider for CachedRateProvider<P> {
    async fn get_rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        self.cache
            .try_get_with((from, to), async {
                debug!(%from, %to, "exchange rate cache miss");
                self.inner.get_rate(from, to).await
            })
            .await
            .map_err(|err| (*err).clone())
    }
}
