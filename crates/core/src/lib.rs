//! Core business logic for Tripper.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage and remote rate lookups are reached through traits implemented by the
//! infra crate.
//!
//! # Modules
//!
//! - `currency` - Exchange rate providers and the rate cache
//! - `settlement` - Balance aggregation, netting and settlement snapshots

pub mod currency;
pub mod settlement;
