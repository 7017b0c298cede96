//! Application configuration management.

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{CurrencyCode, CurrencyError};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Settlement configuration.
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Exchange rate provider configuration.
    #[serde(default)]
    pub exchange_rates: ExchangeRateConfig,
}

/// Settlement configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Currency every balance and transfer is expressed in.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
}

fn default_base_currency() -> String {
    "CHF".to_string()
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            base_currency: default_base_currency(),
        }
    }
}

impl SettlementConfig {
    /// Returns the validated base currency.
    pub fn base_currency(&self) -> Result<CurrencyCode, CurrencyError> {
        CurrencyCode::parse(&self.base_currency)
    }
}

/// Exchange rate provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRateConfig {
    /// Base URL of the exchange rate API (the API key is appended as a path segment).
    #[serde(default = "default_rates_base_url")]
    pub base_url: String,
    /// API key; when empty only the fixed rate table is used.
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Absolute lifetime of a cached rate in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Idle lifetime of a cached rate in seconds.
    #[serde(default = "default_cache_idle_secs")]
    pub cache_idle_secs: u64,
    /// Maximum number of cached currency pairs.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Fixed rates keyed by `"FROM/TO"`.
    #[serde(default)]
    pub fixed: HashMap<String, Decimal>,
}

fn default_rates_base_url() -> String {
    "https://v6.exchangerate-api.com/v6/".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    1800 // 30 minutes
}

fn default_cache_idle_secs() -> u64 {
    600 // 10 minutes
}

fn default_cache_capacity() -> u64 {
    1000
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            base_url: default_rates_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_idle_secs: default_cache_idle_secs(),
            cache_capacity: default_cache_capacity(),
            fixed: HashMap::new(),
        }
    }
}

impl ExchangeRateConfig {
    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Absolute time-to-live of a cached rate.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Sliding (idle) expiry of a cached rate.
    #[must_use]
    pub const fn cache_idle(&self) -> Duration {
        Duration::from_secs(self.cache_idle_secs)
    }

    /// Returns true when a remote provider is configured.
    #[must_use]
    pub fn has_remote(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Parses the fixed rate table into `(from, to, rate)` triples.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is not of the form `"FROM/TO"` with valid codes.
    pub fn fixed_rates(&self) -> Result<Vec<(CurrencyCode, CurrencyCode, Decimal)>, CurrencyError> {
        let mut rates = Vec::with_capacity(self.fixed.len());
        for (pair, rate) in &self.fixed {
            let (from, to) = pair
                .split_once('/')
                .ok_or_else(|| CurrencyError::Malformed(pair.clone()))?;
            rates.push((CurrencyCode::parse(from)?, CurrencyCode::parse(to)?, *rate));
        }
        Ok(rates)
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TRIPPER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
