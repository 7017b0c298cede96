//! Settlement error types.

use rust_decimal::Decimal;
use thiserror::Error;
use tripper_shared::AppError;
use tripper_shared::types::{CurrencyCode, GroupId, ItemId, UserId};

use crate::currency::RateError;

/// Errors that can occur while computing balances or settlements.
#[derive(Debug, Error)]
pub enum SettlementError {
    // ========== Validation Errors ==========
    /// Expense has no payees, so its share is undefined.
    #[error("Expense {item_id} has no payees")]
    NoPayees {
        /// The offending expense.
        item_id: ItemId,
    },

    /// Expense currency is not a three-letter code.
    #[error("Expense {item_id} has malformed currency code '{code}'")]
    InvalidCurrency {
        /// The offending expense.
        item_id: ItemId,
        /// Raw code as stored.
        code: String,
    },

    /// Expense amount is zero or negative.
    #[error("Expense {item_id} amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The offending expense.
        item_id: ItemId,
        /// Stored amount.
        amount: Decimal,
    },

    /// Converted amount or running balance exceeds the decimal range.
    #[error("Expense {item_id} amount is out of range")]
    AmountOverflow {
        /// The offending expense.
        item_id: ItemId,
    },

    // ========== Upstream Errors ==========
    /// The rate provider could not supply a conversion rate.
    #[error("No exchange rate available for {from} to {to}: {source}")]
    RateUnavailable {
        /// Source currency.
        from: CurrencyCode,
        /// Base currency.
        to: CurrencyCode,
        /// Provider failure.
        #[source]
        source: RateError,
    },

    /// Repository or store failure.
    #[error("Repository error: {0}")]
    Repository(String),

    // ========== Access / Lifecycle Errors ==========
    /// Requesting user is not a current member of the group.
    #[error("User {user_id} is not a member of group {group_id}")]
    NotMember {
        /// Group ID.
        group_id: GroupId,
        /// Requesting user.
        user_id: UserId,
    },

    /// Caller cancelled the computation.
    #[error("Settlement computation was cancelled")]
    Cancelled,
}

impl SettlementError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoPayees { .. } => "NO_PAYEES",
            Self::InvalidCurrency { .. } => "INVALID_CURRENCY",
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Self::RateUnavailable { .. } => "RATE_UNAVAILABLE",
            Self::Repository(_) => "REPOSITORY_ERROR",
            Self::NotMember { .. } => "NOT_MEMBER",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns true for errors caused by bad expense data.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoPayees { .. }
                | Self::InvalidCurrency { .. }
                | Self::NonPositiveAmount { .. }
                | Self::AmountOverflow { .. }
        )
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        let message = err.to_string();
        match err {
            SettlementError::NoPayees { .. }
            | SettlementError::InvalidCurrency { .. }
            | SettlementError::NonPositiveAmount { .. }
            | SettlementError::AmountOverflow { .. } => Self::Validation(message),
            SettlementError::RateUnavailable { .. } => Self::ExternalService(message),
            SettlementError::Repository(_) => Self::Database(message),
            SettlementError::NotMember { .. } => Self::Forbidden(message),
            SettlementError::Cancelled => Self::Cancelled(message),
        }
    }
}
