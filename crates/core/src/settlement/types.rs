//! Settlement domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tripper_shared::types::{CurrencyCode, GroupId, ItemId, SnapshotId, TransferId, UserId};

/// Net balance per user in the base currency.
///
/// Positive: the group owes the user. Negative: the user owes the group.
/// Ordered by user id so every downstream step is deterministic.
pub type Balances = BTreeMap<UserId, Decimal>;

/// An expense ("item") as stored by the expense repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Item ID.
    pub id: ItemId,
    /// Owning group.
    pub group_id: GroupId,
    /// User who fronted the money.
    pub paid_by: UserId,
    /// Amount in `currency`, expected to be positive.
    pub amount: Decimal,
    /// Raw currency code as written by the client; normalized during aggregation.
    pub currency: String,
    /// Short title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Users who share the expense.
    pub payee_ids: Vec<UserId>,
}

impl ExpenseRecord {
    /// Payees with duplicates removed, first occurrence wins.
    #[must_use]
    pub fn distinct_payees(&self) -> Vec<UserId> {
        let mut seen = std::collections::HashSet::with_capacity(self.payee_ids.len());
        self.payee_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// One payment produced by the netting engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Debtor.
    pub from: UserId,
    /// Creditor.
    pub to: UserId,
    /// Positive amount in the base currency, rounded to cents.
    pub amount: Decimal,
}

/// A transfer as persisted inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTransfer {
    /// Transfer ID.
    pub id: TransferId,
    /// Debtor.
    pub from: UserId,
    /// Creditor.
    pub to: UserId,
    /// Amount in the snapshot's base currency.
    pub amount: Decimal,
}

/// Immutable audit record of one settlement run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSnapshot {
    /// Snapshot ID.
    pub id: SnapshotId,
    /// Group the settlement belongs to.
    pub group_id: GroupId,
    /// Currency of every transfer.
    pub base_currency: CurrencyCode,
    /// When the snapshot was created.
    pub created_at: DateTime<Utc>,
    /// User who requested the recalculation.
    pub created_by: UserId,
    /// Instant at which the rates used were resolved.
    pub rates_as_of: Option<DateTime<Utc>>,
    /// Number of expense records included in the run.
    pub items_included: usize,
    /// Transfers in netting order.
    pub transfers: Vec<SnapshotTransfer>,
}

/// One row of the balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLine {
    /// User ID.
    pub user_id: UserId,
    /// Display name, `"Unknown"` when the lookup has none.
    pub username: String,
    /// Net balance in `currency`.
    pub net_balance: Decimal,
    /// Base currency.
    pub currency: CurrencyCode,
    /// False for users who only appear through historical expenses.
    pub is_member: bool,
}

/// Current balances of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// Group ID.
    pub group_id: GroupId,
    /// Base currency.
    pub base_currency: CurrencyCode,
    /// One line per tracked user, ordered by user id.
    pub balances: Vec<BalanceLine>,
}

/// A transfer decorated for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferView {
    /// Debtor.
    pub from_user_id: UserId,
    /// Debtor display name.
    pub from_username: String,
    /// Creditor.
    pub to_user_id: UserId,
    /// Creditor display name.
    pub to_username: String,
    /// Amount.
    pub amount: Decimal,
    /// Currency of `amount`.
    pub currency: CurrencyCode,
}

/// A settlement snapshot decorated for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSnapshotView {
    /// Snapshot ID.
    pub id: SnapshotId,
    /// Group ID.
    pub group_id: GroupId,
    /// Base currency.
    pub base_currency: CurrencyCode,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Requesting user.
    pub created_by_user_id: UserId,
    /// Rates-as-of timestamp.
    pub rates_as_of: Option<DateTime<Utc>>,
    /// Number of expenses included.
    pub items_included: usize,
    /// Transfers.
    pub transfers: Vec<TransferView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_expense_record_from_json() {
        let json = r#"{
            "id": "0190b5a0-0000-7000-8000-000000000101",
            "group_id": "0190b5a0-0000-7000-8000-0000000000aa",
            "paid_by": "0190b5a0-0000-7000-8000-000000000001",
            "amount": "12.50",
            "currency": "chf",
            "title": "Coffee",
            "created_at": "2026-07-01T08:00:00Z",
            "payee_ids": [
                "0190b5a0-0000-7000-8000-000000000002",
                "0190b5a0-0000-7000-8000-000000000001",
                "0190b5a0-0000-7000-8000-000000000002"
            ]
        }"#;

        let record: ExpenseRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.amount, dec!(12.50));
        assert_eq!(record.currency, "chf");
        assert!(record.description.is_empty());
        assert_eq!(record.payee_ids.len(), 3);
        assert_eq!(
            record.distinct_payees(),
            vec![record.payee_ids[0], record.payee_ids[1]]
        );
    }

    #[test]
    fn test_balance_line_serializes_currency_as_code() {
        let line = BalanceLine {
            user_id: UserId::new(),
            username: "alice".to_string(),
            net_balance: dec!(-3.30),
            currency: CurrencyCode::CHF,
            is_member: false,
        };

        let value = serde_json::to_value(&line).unwrap();

        assert_eq!(value["currency"], "CHF");
        assert_eq!(value["net_balance"], "-3.30");
        assert_eq!(value["is_member"], false);
    }
}
