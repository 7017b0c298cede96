//! Rate provider selection.

use rust_decimal::Decimal;
use tracing::info;
use tripper_core::currency::{
    CachedRateProvider, CurrencyRateProvider, FixedRateProvider, RateError,
};
use tripper_infra::ExchangeRateApiProvider;
use tripper_shared::config::ExchangeRateConfig;
use tripper_shared::types::CurrencyCode;

/// The configured rate source, always behind the cache.
pub enum Rates {
    /// Static table from `exchange_rates.fixed`.
    Fixed(CachedRateProvider<FixedRateProvider>),
    /// Remote exchange rate API.
    Remote(CachedRateProvider<ExchangeRateApiProvider>),
}

impl Rates {
    /// Remote provider when an API key is set, fixed table otherwise.
    pub fn from_config(config: &ExchangeRateConfig) -> anyhow::Result<Self> {
        let (capacity, ttl, idle) = (config.cache_capacity, config.cache_ttl(), config.cache_idle());

        if config.has_remote() {
            info!(base_url = %config.base_url, "using remote exchange rates");
            let remote = ExchangeRateApiProvider::from_config(config)?;
            Ok(Self::Remote(CachedRateProvider::with_config(
                remote, capacity, ttl, idle,
            )))
        } else {
            let fixed = FixedRateProvider::from_rates(config.fixed_rates()?);
            info!(pairs = config.fixed.len(), "using fixed exchange rates");
            Ok(Self::Fixed(CachedRateProvider::with_config(
                fixed, capacity, ttl, idle,
            )))
        }
    }
}

impl Rates {
    /// Currencies expenses may use, always including `base`.
    ///
    /// The fixed table lists the codes of its configured pairs. The remote service is
    /// asked for its supported codes.
    pub async fn supported_currencies(
        &self,
        base: CurrencyCode,
    ) -> Result<Vec<CurrencyCode>, RateError> {
        let mut codes: Vec<CurrencyCode> = match self {
            Self::Fixed(p) => p.inner().currencies().into_iter().collect(),
            Self::Remote(p) => p.inner().supported_currencies().await?,
        };
        if let Err(pos) = codes.binary_search(&base) {
            codes.insert(pos, base);
        }
        Ok(codes)
    }
}

impl CurrencyRateProvider for Rates {
    async fn get_rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RateError> {
        match self {
            Self::Fixed(p) => p.get_rate(from, to).await,
            Self::Remote(p) => p.get_rate(from, to).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_fixed_table_without_api_key() {
        let mut config = ExchangeRateConfig::default();
        config.fixed.insert("eur/chf".to_string(), dec!(0.94));

        let rates = Rates::from_config(&config).unwrap();

        assert!(matches!(rates, Rates::Fixed(_)));
        assert_eq!(
            rates.get_rate(CurrencyCode::EUR, CurrencyCode::CHF).await,
            Ok(dec!(0.94))
        );
    }

    #[tokio::test]
    async fn test_fixed_currencies_include_base() {
        let mut config = ExchangeRateConfig::default();
        config.fixed.insert("USD/CHF".to_string(), dec!(0.86));
        config.fixed.insert("EUR/CHF".to_string(), dec!(0.94));

        let rates = Rates::from_config(&config).unwrap();

        assert_eq!(
            rates.supported_currencies(CurrencyCode::CHF).await,
            Ok(vec![CurrencyCode::CHF, CurrencyCode::EUR, CurrencyCode::USD])
        );
        let gbp = CurrencyCode::parse("GBP").unwrap();
        assert_eq!(
            rates.supported_currencies(gbp).await,
            Ok(vec![CurrencyCode::CHF, CurrencyCode::EUR, gbp, CurrencyCode::USD])
        );
    }

    #[test]
    fn test_remote_with_api_key() {
        let config = ExchangeRateConfig {
            api_key: "secret".to_string(),
            ..ExchangeRateConfig::default()
        };

        assert!(matches!(Rates::from_config(&config), Ok(Rates::Remote(_))));
    }

    #[test]
    fn test_bad_fixed_pair_is_reported() {
        let mut config = ExchangeRateConfig::default();
        config.fixed.insert("EURCHF".to_string(), dec!(0.94));

        assert!(Rates::from_config(&config).is_err());
    }
}
