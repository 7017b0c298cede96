//! Settlement service implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use tripper_shared::types::{CurrencyCode, GroupId, SnapshotId, TransferId, UserId};

use super::balance::BalanceAggregator;
use super::error::SettlementError;
use super::netting::compute_transfers;
use super::repository::{
    ExpenseRepository, GroupDirectory, SettlementRepository, SnapshotStore, UserDirectory,
};
use super::types::{
    BalanceLine, BalanceReport, SettlementSnapshot, SettlementSnapshotView, SnapshotTransfer,
    TransferView,
};
use crate::currency::CurrencyRateProvider;

/// Username shown in balance reports when the directory has no entry.
const UNKNOWN_USERNAME: &str = "Unknown";

/// Settlement service for group balances and settlement snapshots.
///
/// Balances and settlements share one aggregation routine, so both always agree.
pub struct SettlementService<R, P> {
    repo: Arc<R>,
    aggregator: BalanceAggregator<P>,
}

impl<R: SettlementRepository, P: CurrencyRateProvider> SettlementService<R, P> {
    /// Create a new settlement service.
    #[must_use]
    pub const fn new(repo: Arc<R>, rates: P, base_currency: CurrencyCode) -> Self {
        Self {
            repo,
            aggregator: BalanceAggregator::new(rates, base_currency),
        }
    }

    /// The currency every balance and transfer is expressed in.
    #[must_use]
    pub const fn base_currency(&self) -> CurrencyCode {
        self.aggregator.base_currency()
    }

    /// Compute the current net balance of every user in the group.
    ///
    /// Current members always appear, at zero if they have no expenses. Former members
    /// that still appear on expenses are listed with `is_member = false`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An expense fails validation
    /// - A rate lookup fails
    /// - The repository fails
    /// - `cancel` fires
    #[instrument(skip_all, fields(group_id = %group_id))]
    pub async fn compute_balances(
        &self,
        group_id: GroupId,
        cancel: &CancellationToken,
    ) -> Result<BalanceReport, SettlementError> {
        let members = self.repo.list_members(group_id).await?;
        let expenses = self.repo.list_expenses(group_id).await?;

        let balances = self
            .aggregator
            .compute_balances(&members, &expenses, cancel)
            .await?;

        let user_ids: Vec<UserId> = balances.keys().copied().collect();
        let names = self.repo.lookup_usernames(&user_ids).await?;
        let member_set: BTreeSet<UserId> = members.into_iter().collect();
        let currency = self.base_currency();

        let lines = balances
            .into_iter()
            .map(|(user_id, net_balance)| BalanceLine {
                user_id,
                username: names
                    .get(&user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_USERNAME.to_string()),
                net_balance,
                currency,
                is_member: member_set.contains(&user_id),
            })
            .collect();

        Ok(BalanceReport {
            group_id,
            base_currency: currency,
            balances: lines,
        })
    }

    /// Recalculate the group's settlement and store it as a new snapshot.
    ///
    /// Nothing is written unless the whole computation succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `requested_by` is not a current member
    /// - An expense fails validation
    /// - A rate lookup fails
    /// - The repository fails
    /// - `cancel` fires before the snapshot is stored
    #[instrument(skip_all, fields(group_id = %group_id, requested_by = %requested_by))]
    pub async fn compute_settlement(
        &self,
        group_id: GroupId,
        requested_by: UserId,
        cancel: &CancellationToken,
    ) -> Result<SettlementSnapshotView, SettlementError> {
        self.ensure_member(group_id, requested_by).await?;

        let members = self.repo.list_members(group_id).await?;
        let expenses = self.repo.list_expenses(group_id).await?;

        let balances = self
            .aggregator
            .compute_balances(&members, &expenses, cancel)
            .await?;
        let rates_as_of = Utc::now();

        let transfers = compute_transfers(&balances);

        if cancel.is_cancelled() {
            return Err(SettlementError::Cancelled);
        }

        let snapshot = SettlementSnapshot {
            id: SnapshotId::new(),
            group_id,
            base_currency: self.base_currency(),
            created_at: Utc::now(),
            created_by: requested_by,
            rates_as_of: Some(rates_as_of),
            items_included: expenses.len(),
            transfers: transfers
                .iter()
                .map(|t| SnapshotTransfer {
                    id: TransferId::new(),
                    from: t.from,
                    to: t.to,
                    amount: t.amount,
                })
                .collect(),
        };

        self.repo.save_snapshot(&snapshot).await?;

        info!(
            snapshot_id = %snapshot.id,
            items = snapshot.items_included,
            transfers = snapshot.transfers.len(),
            "settlement snapshot created"
        );

        let names = self.names_for(std::slice::from_ref(&snapshot)).await?;
        Ok(to_view(&snapshot, &names))
    }

    /// Stored settlements of the group, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if `requested_by` is not a current member or the repository fails.
    #[instrument(skip_all, fields(group_id = %group_id, requested_by = %requested_by))]
    pub async fn settlement_history(
        &self,
        group_id: GroupId,
        requested_by: UserId,
    ) -> Result<Vec<SettlementSnapshotView>, SettlementError> {
        self.ensure_member(group_id, requested_by).await?;

        let snapshots = self.repo.list_snapshots(group_id).await?;
        let names = self.names_for(&snapshots).await?;

        Ok(snapshots.iter().map(|s| to_view(s, &names)).collect())
    }

    /// Most recent stored settlement of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if `requested_by` is not a current member or the repository fails.
    #[instrument(skip_all, fields(group_id = %group_id, requested_by = %requested_by))]
    pub async fn latest_settlement(
        &self,
        group_id: GroupId,
        requested_by: UserId,
    ) -> Result<Option<SettlementSnapshotView>, SettlementError> {
        self.ensure_member(group_id, requested_by).await?;

        let Some(snapshot) = self.repo.latest_snapshot(group_id).await? else {
            return Ok(None);
        };
        let names = self.names_for(std::slice::from_ref(&snapshot)).await?;

        Ok(Some(to_view(&snapshot, &names)))
    }

    async fn ensure_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), SettlementError> {
        if self.repo.is_member(group_id, user_id).await? {
            Ok(())
        } else {
            Err(SettlementError::NotMember { group_id, user_id })
        }
    }

    /// Looks up every user named in the snapshots' transfers.
    async fn names_for(
        &self,
        snapshots: &[SettlementSnapshot],
    ) -> Result<HashMap<UserId, String>, SettlementError> {
        let ids: BTreeSet<UserId> = snapshots
            .iter()
            .flat_map(|s| s.transfers.iter().flat_map(|t| [t.from, t.to]))
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<UserId> = ids.into_iter().collect();
        self.repo.lookup_usernames(&ids).await
    }
}

fn to_view(snapshot: &SettlementSnapshot, names: &HashMap<UserId, String>) -> SettlementSnapshotView {
    let name = |id: &UserId| names.get(id).cloned().unwrap_or_default();

    SettlementSnapshotView {
        id: snapshot.id,
        group_id: snapshot.group_id,
        base_currency: snapshot.base_currency,
        created_at: snapshot.created_at,
        created_by_user_id: snapshot.created_by,
        rates_as_of: snapshot.rates_as_of,
        items_included: snapshot.items_included,
        transfers: snapshot
            .transfers
            .iter()
            .map(|t| TransferView {
                from_user_id: t.from,
                from_username: name(&t.from),
                to_user_id: t.to,
                to_username: name(&t.to),
                amount: t.amount,
                currency: snapshot.base_currency,
            })
            .collect(),
    }
}
