//! Multi-currency handling and exchange rates.
//!
//! Every monetary value is normalized to the deployment's base currency before it
//! enters a balance. The rate provider is injected so tests can bypass both the
//! remote service and the cache.

pub mod cache;
pub mod fixed;
pub mod rate;

#[cfg(test)]
mod props;
#[cfg(test)]
pub(crate) mod testing;

pub use cache::CachedRateProvider;
pub use fixed::FixedRateProvider;
pub use rate::{CurrencyRateProvider, RateError};
