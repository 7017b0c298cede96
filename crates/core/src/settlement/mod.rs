//! Group balances and settlement netting.
//!
//! Expenses are aggregated into per-user balances in the base currency, then netted
//! into a short list of transfers. Each settlement run is stored as an immutable snapshot.

pub mod balance;
pub mod error;
pub mod netting;
pub mod repository;
pub mod service;
pub mod types;


pub use balance::BalanceAggregator;
pub use error::SettlementError;
pub use netting::{SETTLED_TOLERANCE, compute_transfers};
pub use repository::{
    ExpenseRepository, GroupDirectory, SettlementRepository, SnapshotStore, UserDirectory,
};
pub use service::SettlementService;
pub use types::*;
