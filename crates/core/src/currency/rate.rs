//! Exchange rate provider contract.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tripper_shared::types::CurrencyCode;

/// Errors returned by a rate lookup.
///
/// `Clone` so a single failed lookup can be handed to every waiter of a coalesced cache miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// The provider does not know this currency pair.
    #[error("Unknown currency pair {from}/{to}")]
    UnknownPair {
        /// Source currency code.
        from: CurrencyCode,
        /// Target currency code.
        to: CurrencyCode,
    },

    /// The provider returned a zero or negative rate.
    #[error("Provider returned a non-positive rate for {from}/{to}")]
    InvalidRate {
        /// Source currency code.
        from: CurrencyCode,
        /// Target currency code.
        to: CurrencyCode,
    },

    /// The remote lookup did not answer in time.
    #[error("Exchange rate lookup timed out")]
    Timeout,

    /// The remote service failed or answered with an error.
    #[error("Exchange rate service error: {0}")]
    Remote(String),
}

/// Supplies conversion rates between two currencies.
///
/// The rate is the multiplier such that `amount_in_to = amount_in_from * rate`.
/// Implementations must return exactly `1` for `from == to` without performing a lookup.
pub trait CurrencyRateProvider: Send + Sync {
    /// Looks up the rate from `from` to `to`.
    fn get_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> impl Future<Output = Result<Decimal, RateError>> + Send;
}

impl<P: CurrencyRateProvider> CurrencyRateProvider for Arc<P> {
    fn get_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> impl Future<Output = Result<Decimal, RateError>> + Send {
        (**self).get_rate(from, to)
    }
}
