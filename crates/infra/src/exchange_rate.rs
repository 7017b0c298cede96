//! Exchange rate API client.
//!
//! Talks to the v6 endpoints of exchangerate-api.com:
//! - `GET {base_url}{api_key}/latest/{FROM}` returns every rate quoted against `FROM`
//! - `GET {base_url}{api_key}/codes` lists the supported currencies
//!
//! Wrap it in [`tripper_core::currency::CachedRateProvider`] so one response is reused.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use tripper_core::currency::{CurrencyRateProvider, RateError};
use tripper_shared::config::ExchangeRateConfig;
use tripper_shared::types::CurrencyCode;

/// Exchange rate API client.
#[derive(Debug, Clone)]
pub struct ExchangeRateApiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

/// Body of a `latest` response.
#[derive(Debug, Deserialize)]
pub struct LatestResponse {
    /// `"success"` or `"error"`.
    #[serde(default)]
    pub result: String,
    /// Error kind when `result` is `"error"`, e.g. `"invalid-key"`.
    #[serde(rename = "error-type", default)]
    pub error_type: Option<String>,
    /// Currency the rates are quoted against.
    #[serde(default)]
    pub base_code: Option<String>,
    /// Rates keyed by target currency code.
    #[serde(default)]
    pub conversion_rates: HashMap<String, Decimal>,
}

/// Body of a `codes` response.
#[derive(Debug, Deserialize)]
pub struct CodesResponse {
    /// `"success"` or `"error"`.
    #[serde(default)]
    pub result: String,
    /// Error kind when `result` is `"error"`.
    #[serde(rename = "error-type", default)]
    pub error_type: Option<String>,
    /// `[code, name]` pairs.
    #[serde(default)]
    pub supported_codes: Vec<(String, String)>,
}

impl ExchangeRateApiProvider {
    /// Create a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns `RateError::Remote` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Remote(format!("failed to build HTTP client: {e}")))?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Create a client from the `exchange_rates` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `RateError::Remote` if the HTTP client cannot be built.
    pub fn from_config(config: &ExchangeRateConfig) -> Result<Self, RateError> {
        Self::new(config.base_url.clone(), config.api_key.trim(), config.timeout())
    }

    fn latest_url(&self, from: CurrencyCode) -> String {
        format!("{}{}/latest/{}", self.base_url, self.api_key, from)
    }

    fn codes_url(&self) -> String {
        format!("{}{}/codes", self.base_url, self.api_key)
    }

    /// Fetches the currencies the service can quote, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RateError::Timeout` or `RateError::Remote` when the request fails or the
    /// service reports an error.
    pub async fn supported_currencies(&self) -> Result<Vec<CurrencyCode>, RateError> {
        debug!("requesting supported currencies");

        let response = self
            .client
            .get(self.codes_url())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        match response.json::<CodesResponse>().await {
            Ok(codes) => extract_codes(&codes),
            Err(e) if e.is_timeout() => Err(RateError::Timeout),
            Err(_) if !status.is_success() => {
                Err(RateError::Remote(format!("HTTP {}", status.as_u16())))
            }
            Err(e) => Err(RateError::Remote(format!(
                "malformed response: {}",
                e.without_url()
            ))),
        }
    }

    fn map_request_error(&self, error: reqwest::Error) -> RateError {
        if error.is_timeout() {
            RateError::Timeout
        } else if error.is_connect() {
            RateError::Remote("unable to connect to exchange rate service".to_string())
        } else {
            // The URL carries the API key, so it is stripped from the message.
            RateError::Remote(format!(
                "request failed after up to {}s: {}",
                self.timeout.as_secs(),
                error.without_url()
            ))
        }
    }
}

impl CurrencyRateProvider for ExchangeRateApiProvider {
    async fn get_rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        debug!(%from, %to, "requesting exchange rate");

        let response = self
            .client
            .get(self.latest_url(from))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = response.json::<LatestResponse>().await;

        match body {
            Ok(latest) => extract_rate(&latest, from, to),
            Err(e) if e.is_timeout() => Err(RateError::Timeout),
            Err(_) if !status.is_success() => {
                Err(RateError::Remote(format!("HTTP {}", status.as_u16())))
            }
            Err(e) => Err(RateError::Remote(format!(
                "malformed response: {}",
                e.without_url()
            ))),
        }
    }
}

/// Picks the `from -> to` rate out of a `latest` response.
///
/// # Errors
///
/// - `RateError::Remote` when the service reports an error or quotes another base
/// - `RateError::UnknownPair` when `to` is missing
/// - `RateError::InvalidRate` when the rate is not positive
pub fn extract_rate(
    response: &LatestResponse,
    from: CurrencyCode,
    to: CurrencyCode,
) -> Result<Decimal, RateError> {
    if !response.result.eq_ignore_ascii_case("success") {
        return Err(RateError::Remote(
            response
                .error_type
                .clone()
                .unwrap_or_else(|| "exchange_rate_error".to_string()),
        ));
    }

    if let Some(base) = &response.base_code
        && !base.trim().eq_ignore_ascii_case(from.as_str())
    {
        return Err(RateError::Remote(format!(
            "expected rates for {from}, got {base}"
        )));
    }

    match response.conversion_rates.get(to.as_str()) {
        Some(rate) if *rate > Decimal::ZERO => Ok(*rate),
        Some(_) => Err(RateError::InvalidRate { from, to }),
        None => Err(RateError::UnknownPair { from, to }),
    }
}

/// Collects the well-formed codes of a `codes` response, sorted and deduplicated.
///
/// # Errors
///
/// Returns `RateError::Remote` when the service reports an error.
pub fn extract_codes(response: &CodesResponse) -> Result<Vec<CurrencyCode>, RateError> {
    if !response.result.eq_ignore_ascii_case("success") {
        return Err(RateError::Remote(
            response
                .error_type
                .clone()
                .unwrap_or_else(|| "exchange_rate_error".to_string()),
        ));
    }

    let mut codes: Vec<CurrencyCode> = response
        .supported_codes
        .iter()
        .filter_map(|(code, _)| CurrencyCode::parse(code).ok())
        .collect();
    codes.sort();
    codes.dedup();
    Ok(codes)
}
