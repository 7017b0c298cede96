//! Persistence ports used by the settlement service.
//!
//! These traits are implemented by the infra crate. Every failure is reported as
//! [`SettlementError::Repository`].

use std::collections::HashMap;
use std::future::Future;

use tripper_shared::types::{GroupId, UserId};

use super::error::SettlementError;
use super::types::{ExpenseRecord, SettlementSnapshot};

/// Read access to a group's expenses.
pub trait ExpenseRepository: Send + Sync {
    /// All expense records of the group, in no particular order.
    fn list_expenses(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Vec<ExpenseRecord>, SettlementError>> + Send;
}

/// Group membership.
pub trait GroupDirectory: Send + Sync {
    /// Current members of the group.
    fn list_members(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Vec<UserId>, SettlementError>> + Send;

    /// Whether `user_id` is a current member of the group.
    fn is_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SettlementError>> + Send;
}

/// Display names, used only to decorate output.
pub trait UserDirectory: Send + Sync {
    /// Usernames for the given ids. Unknown ids are simply absent from the map.
    fn lookup_usernames(
        &self,
        user_ids: &[UserId],
    ) -> impl Future<Output = Result<HashMap<UserId, String>, SettlementError>> + Send;
}

/// Append-only storage of settlement snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Persists a snapshot together with its transfers.
    fn save_snapshot(
        &self,
        snapshot: &SettlementSnapshot,
    ) -> impl Future<Output = Result<(), SettlementError>> + Send;

    /// Snapshots of the group, newest first.
    fn list_snapshots(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Vec<SettlementSnapshot>, SettlementError>> + Send;

    /// Most recent snapshot of the group, if any.
    fn latest_snapshot(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Option<SettlementSnapshot>, SettlementError>> + Send;
}

/// Everything the settlement service needs from storage.
pub trait SettlementRepository:
    ExpenseRepository + GroupDirectory + UserDirectory + SnapshotStore
{
}

impl<T> SettlementRepository for T where
    T: ExpenseRepository + GroupDirectory + UserDirectory + SnapshotStore
{
}
