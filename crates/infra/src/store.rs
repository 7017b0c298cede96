//! In-memory storage for groups, expenses and settlement snapshots.
//!
//! Implements every settlement port on top of `DashMap`, so one store can be shared
//! between concurrent settlement runs. Seeded from a JSON fixture by the CLI and the
//! integration tests; the CLI writes the fixture back so stored snapshots survive
//! between runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tripper_core::settlement::{
    ExpenseRecord, ExpenseRepository, GroupDirectory, SettlementError, SettlementSnapshot,
    SnapshotStore, UserDirectory,
};
use tripper_shared::types::{GroupId, ItemId, UserId};

/// Errors raised while loading a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Fixture file could not be read or written.
    #[error("Failed to access fixture {path}: {source}")]
    Io {
        /// Fixture path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Fixture is not valid JSON for the expected shape, or could not be encoded.
    #[error("Invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),

    /// An item points at a group the fixture does not declare.
    #[error("Item {item_id} belongs to undeclared group {group_id}")]
    UnknownGroup {
        /// Offending item.
        item_id: ItemId,
        /// Group it references.
        group_id: GroupId,
    },
}

/// A user entry of a fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureUser {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub username: String,
}

/// A group entry of a fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureGroup {
    /// Group ID.
    pub id: GroupId,
    /// Current members. Users that only appear on items are former members.
    #[serde(default)]
    pub members: Vec<UserId>,
}

/// Seed data for a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Known users.
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    /// Groups and their current members.
    #[serde(default)]
    pub groups: Vec<FixtureGroup>,
    /// Expense records.
    #[serde(default)]
    pub items: Vec<ExpenseRecord>,
    /// Stored settlement snapshots, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<SettlementSnapshot>,
}

/// In-memory implementation of the settlement ports.
#[derive(Debug, Default)]
pub struct MemoryStore {
    usernames: DashMap<UserId, String>,
    members: DashMap<GroupId, Vec<UserId>>,
    items: DashMap<GroupId, Vec<ExpenseRecord>>,
    snapshots: DashMap<GroupId, Vec<SettlementSnapshot>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from fixture data.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownGroup` if an item references an undeclared group.
    pub fn from_fixture(fixture: Fixture) -> Result<Self, StoreError> {
        let store = Self::new();

        for user in fixture.users {
            store.add_user(user.id, user.username);
        }
        for group in fixture.groups {
            store.add_group(group.id, group.members);
        }
        for item in fixture.items {
            if !store.members.contains_key(&item.group_id) {
                return Err(StoreError::UnknownGroup {
                    item_id: item.id,
                    group_id: item.group_id,
                });
            }
            store.add_expense(item);
        }
        for snapshot in fixture.snapshots {
            store
                .snapshots
                .entry(snapshot.group_id)
                .or_default()
                .push(snapshot);
        }

        debug!(
            users = store.usernames.len(),
            groups = store.members.len(),
            snapshots = store.snapshots.iter().map(|s| s.len()).sum::<usize>(),
            "loaded fixture"
        );
        Ok(store)
    }

    /// Export the current contents as fixture data.
    ///
    /// Users and groups are ordered by id. Items and snapshots keep insertion order.
    #[must_use]
    pub fn to_fixture(&self) -> Fixture {
        let mut users: Vec<FixtureUser> = self
            .usernames
            .iter()
            .map(|entry| FixtureUser {
                id: *entry.key(),
                username: entry.value().clone(),
            })
            .collect();
        users.sort_by_key(|u| u.id);

        let mut groups: Vec<FixtureGroup> = self
            .members
            .iter()
            .map(|entry| FixtureGroup {
                id: *entry.key(),
                members: entry.value().clone(),
            })
            .collect();
        // Expenses may have been added for a group that was never declared.
        for entry in self.items.iter() {
            if !self.members.contains_key(entry.key()) {
                groups.push(FixtureGroup {
                    id: *entry.key(),
                    members: Vec::new(),
                });
            }
        }
        groups.sort_by_key(|g| g.id);

        let items = groups
            .iter()
            .filter_map(|g| self.items.get(&g.id).map(|items| items.clone()))
            .flatten()
            .collect();

        let mut snapshot_groups: Vec<GroupId> = self.snapshots.iter().map(|e| *e.key()).collect();
        snapshot_groups.sort();
        let snapshots = snapshot_groups
            .iter()
            .filter_map(|id| self.snapshots.get(id).map(|stored| stored.clone()))
            .flatten()
            .collect();

        Fixture {
            users,
            groups,
            items,
            snapshots,
        }
    }

    /// Parse a fixture from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or inconsistent.
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Self::from_fixture(serde_json::from_str(json)?)
    }

    /// Read a fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Write the current contents to a fixture file.
    ///
    /// The JSON goes to a sibling temporary file first and is then renamed over `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the contents cannot be encoded or the file cannot be written.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_fixture())?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::write(&tmp, json + "\n").map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;

        debug!(path = %path.display(), "wrote fixture");
        Ok(())
    }

    /// Register or rename a user.
    pub fn add_user(&self, id: UserId, username: impl Into<String>) {
        self.usernames.insert(id, username.into());
    }

    /// Register a group with its current members, replacing any previous membership.
    pub fn add_group(&self, id: GroupId, members: Vec<UserId>) {
        self.members.insert(id, members);
    }

    /// Add a user to a group, creating the group if needed.
    pub fn add_member(&self, group_id: GroupId, user_id: UserId) {
        let mut members = self.members.entry(group_id).or_default();
        if !members.contains(&user_id) {
            members.push(user_id);
        }
    }

    /// Remove a user from a group. Their expenses stay.
    pub fn remove_member(&self, group_id: GroupId, user_id: UserId) -> bool {
        self.members.get_mut(&group_id).is_some_and(|mut members| {
            let before = members.len();
            members.retain(|m| *m != user_id);
            members.len() != before
        })
    }

    /// Store an expense record.
    pub fn add_expense(&self, item: ExpenseRecord) {
        self.items.entry(item.group_id).or_default().push(item);
    }
}

impl ExpenseRepository for MemoryStore {
    async fn list_expenses(&self, group_id: GroupId) -> Result<Vec<ExpenseRecord>, SettlementError> {
        Ok(self
            .items
            .get(&group_id)
            .map(|items| items.clone())
            .unwrap_or_default())
    }
}

impl GroupDirectory for MemoryStore {
    async fn list_members(&self, group_id: GroupId) -> Result<Vec<UserId>, SettlementError> {
        Ok(self
            .members
            .get(&group_id)
            .map(|members| members.clone())
            .unwrap_or_default())
    }

    async fn is_member(&self, group_id: GroupId, user_id: UserId) -> Result<bool, SettlementError> {
        Ok(self
            .members
            .get(&group_id)
            .is_some_and(|members| members.contains(&user_id)))
    }
}

impl UserDirectory for MemoryStore {
    async fn lookup_usernames(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, String>, SettlementError> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.usernames.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}

impl SnapshotStore for MemoryStore {
    async fn save_snapshot(&self, snapshot: &SettlementSnapshot) -> Result<(), SettlementError> {
        self.snapshots
            .entry(snapshot.group_id)
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn list_snapshots(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<SettlementSnapshot>, SettlementError> {
        let mut snapshots: Vec<SettlementSnapshot> = self
            .snapshots
            .get(&group_id)
            .map(|stored| stored.iter().rev().cloned().collect())
            .unwrap_or_default();
        // Stable, so snapshots sharing a timestamp stay newest-inserted first.
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(snapshots)
    }

    async fn latest_snapshot(
        &self,
        group_id: GroupId,
    ) -> Result<Option<SettlementSnapshot>, SettlementError> {
        Ok(self.list_snapshots(group_id).await?.into_iter().next())
    }
}
