//! Adapters for Tripper.
//!
//! - `exchange_rate` - HTTP client for the exchange rate API
//! - `store` - In-memory groups, expenses and snapshots loaded from JSON fixtures

pub mod exchange_rate;
pub mod store;

pub use exchange_rate::ExchangeRateApiProvider;
pub use store::{Fixture, MemoryStore, StoreError};
