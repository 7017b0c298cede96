//! Balance aggregation.
//!
//! Turns a group's expense records into one net balance per user in the base currency:
//! the payer is credited the converted amount, every distinct payee is debited an equal
//! share. Amounts are rounded at conversion and at share time, so the sum of all balances
//! can drift from zero by up to half a cent per payee per expense. That residue is left
//! in place rather than redistributed.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tripper_shared::types::{CurrencyCode, UserId, round_money};

use super::error::SettlementError;
use super::types::{Balances, ExpenseRecord};
use crate::currency::CurrencyRateProvider;

/// Aggregates expenses into per-user balances.
pub struct BalanceAggregator<P> {
    rates: P,
    base_currency: CurrencyCode,
}

impl<P: CurrencyRateProvider> BalanceAggregator<P> {
    /// Creates an aggregator that converts into `base_currency` using `rates`.
    #[must_use]
    pub const fn new(rates: P, base_currency: CurrencyCode) -> Self {
        Self {
            rates,
            base_currency,
        }
    }

    /// The currency every balance is expressed in.
    #[must_use]
    pub const fn base_currency(&self) -> CurrencyCode {
        self.base_currency
    }

    /// Computes net balances.
    ///
    /// Every member starts at zero. Users that appear on an expense without being a
    /// current member are still tracked so the balances keep netting out.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid expense (checked for a positive amount, then a
    /// well-formed currency, then at least one payee), when a converted amount or a
    /// running balance no longer fits a `Decimal`, on any rate lookup failure, and when
    /// `cancel` fires. No partial result is ever returned.
    pub async fn compute_balances(
        &self,
        members: &[UserId],
        expenses: &[ExpenseRecord],
        cancel: &CancellationToken,
    ) -> Result<Balances, SettlementError> {
        let member_set: BTreeSet<UserId> = members.iter().copied().collect();
        let mut balances: Balances = members.iter().map(|id| (*id, Decimal::ZERO)).collect();

        for expense in expenses {
            if cancel.is_cancelled() {
                return Err(SettlementError::Cancelled);
            }

            let (currency, payees) = validate(expense)?;
            let amount_base = self.amount_in_base(expense, currency, cancel).await?;

            track(&mut balances, &member_set, expense, expense.paid_by, amount_base)?;

            let share = round_money(amount_base / Decimal::from(payees.len()));
            for payee in payees {
                track(&mut balances, &member_set, expense, payee, -share)?;
            }
        }

        for balance in balances.values_mut() {
            *balance = round_money(*balance);
        }

        Ok(balances)
    }

    /// Converts one expense to the base currency, rounded to cents.
    async fn amount_in_base(
        &self,
        expense: &ExpenseRecord,
        currency: CurrencyCode,
        cancel: &CancellationToken,
    ) -> Result<Decimal, SettlementError> {
        let rate = if currency == self.base_currency {
            Decimal::ONE
        } else {
            let rate = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(SettlementError::Cancelled),
                result = self.rates.get_rate(currency, self.base_currency) => {
                    result.map_err(|source| SettlementError::RateUnavailable {
                        from: currency,
                        to: self.base_currency,
                        source,
                    })
                }
            }?;
            debug!(item_id = %expense.id, %currency, %rate, "resolved exchange rate");
            rate
        };

        expense
            .amount
            .checked_mul(rate)
            .map(round_money)
            .ok_or(SettlementError::AmountOverflow {
                item_id: expense.id,
            })
    }
}

/// Checks one expense: positive amount, then currency, then payees.
fn validate(expense: &ExpenseRecord) -> Result<(CurrencyCode, Vec<UserId>), SettlementError> {
    if expense.amount <= Decimal::ZERO {
        return Err(SettlementError::NonPositiveAmount {
            item_id: expense.id,
            amount: expense.amount,
        });
    }

    let currency =
        CurrencyCode::parse(&expense.currency).map_err(|_| SettlementError::InvalidCurrency {
            item_id: expense.id,
            code: expense.currency.clone(),
        })?;

    let payees = expense.distinct_payees();
    if payees.is_empty() {
        return Err(SettlementError::NoPayees {
            item_id: expense.id,
        });
    }

    Ok((currency, payees))
}

/// Adds `delta` to `user`'s balance, starting untracked users at zero.
fn track(
    balances: &mut Balances,
    members: &BTreeSet<UserId>,
    expense: &ExpenseRecord,
    user: UserId,
    delta: Decimal,
) -> Result<(), SettlementError> {
    let entry = balances.entry(user).or_insert_with(|| {
        if !members.contains(&user) {
            warn!(user_id = %user, "tracking balance of a user who is no longer a member");
        }
        Decimal::ZERO
    });
    *entry = entry
        .checked_add(delta)
        .ok_or(SettlementError::AmountOverflow {
            item_id: expense.id,
        })?;
    Ok(())
}
