//! Rate provider backed by a static rate table.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use tripper_shared::types::CurrencyCode;

use super::rate::{CurrencyRateProvider, RateError};

/// Serves rates from an in-memory table.
///
/// Used for offline runs and deterministic tests. When only `B -> A` is configured,
/// a request for `A -> B` is answered with `1 / rate`.
#[derive(Debug, Clone, Default)]
pub struct FixedRateProvider {
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl FixedRateProvider {
    /// Creates an empty provider that only knows identity pairs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider from `(from, to, rate)` triples.
    #[must_use]
    pub fn from_rates(rates: impl IntoIterator<Item = (CurrencyCode, CurrencyCode, Decimal)>) -> Self {
        Self {
            rates: rates
                .into_iter()
                .map(|(from, to, rate)| ((from, to), rate))
                .collect(),
        }
    }

    /// Adds or replaces a rate.
    #[must_use]
    pub fn with_rate(mut self, from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }

    /// Every currency that appears on either side of a configured pair, sorted.
    #[must_use]
    pub fn currencies(&self) -> BTreeSet<CurrencyCode> {
        self.rates.keys().flat_map(|(from, to)| [*from, *to]).collect()
    }

    /// Resolves a rate without any async machinery.
    ///
    /// # Errors
    ///
    /// Returns `RateError::UnknownPair` if neither direction is configured and
    /// `RateError::InvalidRate` if the configured rate is not positive.
    pub fn lookup(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        if let Some(rate) = self.rates.get(&(from, to)) {
            return if *rate > Decimal::ZERO {
                Ok(*rate)
            } else {
                Err(RateError::InvalidRate { from, to })
            };
        }

        match self.rates.get(&(to, from)) {
            Some(rate) if *rate > Decimal::ZERO => Ok(Decimal::ONE / *rate),
            Some(_) => Err(RateError::InvalidRate { from, to }),
            None => Err(RateError::UnknownPair { from, to }),
        }
    }
}

impl CurrencyRateProvider for FixedRateProvider {
    async fn get_rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RateError> {
        self.lookup(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_identity_needs_no_table() {
        let provider = FixedRateProvider::new();
        assert_eq!(
            provider.lookup(CurrencyCode::USD, CurrencyCode::USD),
            Ok(Decimal::ONE)
        );
    }

    #[test]
    fn test_direct_rate() {
        let provider =
            FixedRateProvider::new().with_rate(CurrencyCode::EUR, CurrencyCode::CHF, dec!(0.94));
        assert_eq!(
            provider.lookup(CurrencyCode::EUR, CurrencyCode::CHF),
            Ok(dec!(0.94))
        );
    }

    #[test]
    fn test_inverse_rate() {
        let provider =
            FixedRateProvider::new().with_rate(CurrencyCode::CHF, CurrencyCode::EUR, dec!(1.25));
        assert_eq!(
            provider.lookup(CurrencyCode::EUR, CurrencyCode::CHF),
            Ok(dec!(0.8))
        );
    }

    #[test]
    fn test_unknown_pair() {
        let provider = FixedRateProvider::new();
        assert_eq!(
            provider.lookup(CurrencyCode::EUR, CurrencyCode::CHF),
            Err(RateError::UnknownPair {
                from: CurrencyCode::EUR,
                to: CurrencyCode::CHF,
            })
        );
    }

    #[test]
    fn test_non_positive_rate_is_rejected() {
        let provider =
            FixedRateProvider::from_rates([(CurrencyCode::EUR, CurrencyCode::CHF, Decimal::ZERO)]);
        assert!(matches!(
            provider.lookup(CurrencyCode::EUR, CurrencyCode::CHF),
            Err(RateError::InvalidRate { .. })
        ));
        assert!(matches!(
            provider.lookup(CurrencyCode::CHF, CurrencyCode::EUR),
            Err(RateError::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_currencies_covers_both_sides() {
        let provider = FixedRateProvider::new()
            .with_rate(CurrencyCode::USD, CurrencyCode::CHF, dec!(0.88))
            .with_rate(CurrencyCode::EUR, CurrencyCode::CHF, dec!(0.94));

        let codes: Vec<CurrencyCode> = provider.currencies().into_iter().collect();
        assert_eq!(codes, vec![CurrencyCode::CHF, CurrencyCode::EUR, CurrencyCode::USD]);
        assert!(FixedRateProvider::new().currencies().is_empty());
    }

    #[tokio::test]
    async fn test_async_lookup_matches_sync() {
        let provider =
            FixedRateProvider::new().with_rate(CurrencyCode::USD, CurrencyCode::CHF, dec!(0.88));
        let rate = provider
            .get_rate(CurrencyCode::USD, CurrencyCode::CHF)
            .await
            .unwrap();
        assert_eq!(rate, dec!(0.88));
    }
}
