//! Rate providers for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use rust_decimal::Decimal;
use tripper_shared::types::CurrencyCode;

use super::fixed::FixedRateProvider;
use super::rate::{CurrencyRateProvider, RateError};

/// Fixed-table provider that counts how often it is asked.
#[derive(Debug, Default)]
pub struct CountingProvider {
    table: FixedRateProvider,
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn new(table: FixedRateProvider) -> Self {
        Self {
            table,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CurrencyRateProvider for CountingProvider {
    async fn get_rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table.lookup(from, to)
    }
}

/// Provider whose lookups never complete.
#[derive(Debug, Default)]
pub struct PendingProvider;

impl CurrencyRateProvider for PendingProvider {
    async fn get_rate(&self, _from: CurrencyCode, _to: CurrencyCode) -> Result<Decimal, RateError> {
        std::future::pending().await
    }
}
