//! Undo and commit logs.
//!
//! Writes are applied to stores in place. Each one pushes an [`UndoAction`]
//! describing how to restore what it replaced; rollback replays them newest
//! first. Work that must wait for a successful commit, such as physically
//! removing deleted entries, is queued as a [`CommitAction`] and replayed in
//! recording order.

use crate::catalog::Catalog;
use crate::store::{Entry, SharedIndex, StoreSlot};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Restores state overwritten by one mutation.
pub(crate) enum UndoAction {
    /// Removes a key that did not exist before the put.
    RemoveInserted { index: SharedIndex, key: Bytes },
    /// Puts back the entry a put replaced, tombstone flag included.
    RestoreEntry {
        index: SharedIndex,
        key: Bytes,
        entry: Entry,
    },
    /// Clears the tombstone set by a delete.
    Untombstone { index: SharedIndex, key: Bytes },
    /// Reinstalls the container a truncate swapped out.
    RestoreContainer {
        slot: Arc<StoreSlot>,
        index: SharedIndex,
    },
    /// Unregisters a store created by the transaction.
    UncreateStore { slot: Arc<StoreSlot> },
    /// Registers a store dropped by the transaction again.
    RestoreStore { slot: Arc<StoreSlot> },
}

impl UndoAction {
    fn apply(self, catalog: &Catalog) {
        match self {
            UndoAction::RemoveInserted { index, key } => {
                index.write().remove(&key);
            }
            UndoAction::RestoreEntry { index, key, entry } => {
                index.write().set(key, entry);
            }
            UndoAction::Untombstone { index, key } => {
                index.write().set_tombstone(&key, false);
            }
            UndoAction::RestoreContainer { slot, index } => {
                slot.replace(index);
            }
            UndoAction::UncreateStore { slot } => {
                catalog.remove_slot(&slot);
            }
            UndoAction::RestoreStore { slot } => {
                let restored = catalog.insert(slot);
                debug_assert!(restored, "store name reused without undo");
            }
        }
    }
}

/// Deferred work run once the transaction commits.
pub(crate) enum CommitAction {
    /// Physically removes `key` if it is still deleted.
    Purge { index: SharedIndex, key: Bytes },
}

impl CommitAction {
    fn apply(self) -> bool {
        match self {
            CommitAction::Purge { index, key } => index.write().purge(&key),
        }
    }
}

/// Per-transaction log of undo and commit actions.
#[derive(Default)]
pub(crate) struct TxLog {
    undo: Vec<UndoAction>,
    on_commit: Vec<CommitAction>,
}

impl TxLog {
    pub(crate) fn record_undo(&mut self, action: UndoAction) {
        self.undo.push(action);
    }

    pub(crate) fn record_commit(&mut self, action: CommitAction) {
        self.on_commit.push(action);
    }

    #[cfg(test)]
    pub(crate) fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn commit_len(&self) -> usize {
        self.on_commit.len()
    }

    /// Runs the commit actions in recording order and discards the undo log.
    ///
    /// Returns the number of entries physically removed.
    pub(crate) fn commit(self) -> usize {
        self.on_commit
            .into_iter()
            .map(CommitAction::apply)
            .filter(|purged| *purged)
            .count()
    }

    /// Runs the undo actions newest first and discards the commit log.
    ///
    /// Returns the number of actions replayed.
    pub(crate) fn rollback(self, catalog: &Catalog) -> usize {
        let count = self.undo.len();
        for action in self.undo.into_iter().rev() {
            action.apply(catalog);
        }
        count
    }
}

impl fmt::Debug for TxLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxLog")
            .field("undo", &self.undo.len())
            .field("on_commit", &self.on_commit.len())
            .finish()
    }
}
