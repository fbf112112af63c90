//! Named stores and their transactional operations.
//!
//! A store is an ordered map of non-empty byte keys to non-empty byte values.
//! All access goes through a [`Store`] handle borrowed from a
//! [`Transaction`]; every mutation records the inverse action in the
//! transaction's undo log so that a rollback restores the previous state.
//!
//! Deletes are soft: the entry is tombstoned and stays in the container until
//! the transaction commits. Iterators opened in the same transaction walk the
//! very same container, and tombstoning never moves a key.

mod index;

pub(crate) use index::{Entry, OrderedIndex, SharedIndex};

use crate::error::{CoreError, CoreResult};
use crate::iterator::StoreIterator;
use crate::transaction::{CommitAction, Transaction, UndoAction};
use crate::types::Direction;
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::trace;

/// A named slot in the engine's catalog.
///
/// The slot owns a handle to the store's current container. Truncate swaps the
/// handle; anything still holding the old handle keeps a consistent view of the
/// old container.
#[derive(Debug)]
pub(crate) struct StoreSlot {
    name: String,
    index: RwLock<SharedIndex>,
}

impl StoreSlot {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: RwLock::new(OrderedIndex::shared()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current container.
    pub(crate) fn current(&self) -> SharedIndex {
        Arc::clone(&self.index.read())
    }

    /// Installs `index` as the current container and returns the old one.
    pub(crate) fn replace(&self, index: SharedIndex) -> SharedIndex {
        std::mem::replace(&mut *self.index.write(), index)
    }
}

/// Handle to a store within a transaction.
///
/// Obtained from [`Transaction::store`] or [`Transaction::create_store`].
/// The handle borrows the transaction, so it cannot outlive it.
pub struct Store<'t> {
    tx: &'t Transaction<'t>,
    slot: Arc<StoreSlot>,
}

impl<'t> Store<'t> {
    pub(crate) fn new(tx: &'t Transaction<'t>, slot: Arc<StoreSlot>) -> Self {
        Self { tx, slot }
    }

    /// Returns the store name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.slot.name()
    }

    /// Inserts or overwrites `key`.
    ///
    /// The write is visible to the transaction immediately. Overwriting a key
    /// deleted earlier in the same transaction revives it.
    ///
    /// # Errors
    ///
    /// - `ReadOnlyTransaction` if the transaction is not writable
    /// - `EmptyKey` / `EmptyValue` for zero-length input
    /// - `Cancelled` / `DeadlineExceeded` if the transaction's signal fired
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> CoreResult<()> {
        let result = self.put_inner(key.as_ref(), value.as_ref());
        self.tx.observe(result)
    }

    fn put_inner(&self, key: &[u8], value: &[u8]) -> CoreResult<()> {
        self.tx.ensure_writable()?;
        if key.is_empty() {
            return Err(CoreError::EmptyKey);
        }
        if value.is_empty() {
            return Err(CoreError::EmptyValue);
        }

        let written = key.len() + value.len();
        let index = self.slot.current();
        let key = Bytes::copy_from_slice(key);
        let entry = Entry {
            value: Bytes::copy_from_slice(value),
            tombstone: false,
        };
        let previous = index.write().set(key.clone(), entry);

        // Repeated puts of one key log one entry each; replaying them in
        // reverse ends on the oldest, which is the state before the
        // transaction.
        let undo = match previous {
            Some(entry) => UndoAction::RestoreEntry { index, key, entry },
            None => UndoAction::RemoveInserted { index, key },
        };
        self.tx.record_undo(undo);
        self.tx.stats().record_put(written);
        Ok(())
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` if the key is absent or deleted in this transaction
    /// - `Cancelled` / `DeadlineExceeded` if the transaction's signal fired
    pub fn get(&self, key: impl AsRef<[u8]>) -> CoreResult<Bytes> {
        let result = self.get_inner(key.as_ref());
        self.tx.observe(result)
    }

    fn get_inner(&self, key: &[u8]) -> CoreResult<Bytes> {
        self.tx.ensure_usable()?;
        let value = self
            .slot
            .current()
            .read()
            .get_live(key)
            .cloned()
            .ok_or(CoreError::KeyNotFound)?;
        self.tx.stats().record_get(value.len());
        Ok(value)
    }

    /// Returns true if `key` holds a live value.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> CoreResult<bool> {
        let result = self
            .tx
            .ensure_usable()
            .map(|()| self.slot.current().read().get_live(key.as_ref()).is_some());
        self.tx.observe(result)
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> CoreResult<usize> {
        let result = self
            .tx
            .ensure_usable()
            .map(|()| self.slot.current().read().live_len());
        self.tx.observe(result)
    }

    /// Returns true if the store holds no live keys.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Deletes `key`.
    ///
    /// The entry is only marked deleted; it is physically removed when the
    /// transaction commits, unless a later put in the same transaction
    /// revives it.
    ///
    /// # Errors
    ///
    /// - `ReadOnlyTransaction` if the transaction is not writable
    /// - `KeyNotFound` if the key is absent or already deleted
    /// - `Cancelled` / `DeadlineExceeded` if the transaction's signal fired
    pub fn delete(&self, key: impl AsRef<[u8]>) -> CoreResult<()> {
        let result = self.delete_inner(key.as_ref());
        self.tx.observe(result)
    }

    fn delete_inner(&self, key: &[u8]) -> CoreResult<()> {
        self.tx.ensure_writable()?;

        let index = self.slot.current();
        {
            let mut guard = index.write();
            if guard.get_live(key).is_none() {
                return Err(CoreError::KeyNotFound);
            }
            guard.set_tombstone(key, true);
        }

        let key = Bytes::copy_from_slice(key);
        self.tx.record_undo(UndoAction::Untombstone {
            index: Arc::clone(&index),
            key: key.clone(),
        });
        self.tx.record_commit(CommitAction::Purge { index, key });
        self.tx.stats().record_delete();
        Ok(())
    }

    /// Removes every key by swapping in an empty container.
    ///
    /// Constant time regardless of the store size. Iterators opened before the
    /// truncate keep walking the old container.
    ///
    /// # Errors
    ///
    /// - `ReadOnlyTransaction` if the transaction is not writable
    /// - `Cancelled` / `DeadlineExceeded` if the transaction's signal fired
    pub fn truncate(&self) -> CoreResult<()> {
        let result = self.truncate_inner();
        self.tx.observe(result)
    }

    fn truncate_inner(&self) -> CoreResult<()> {
        self.tx.ensure_writable()?;

        let previous = self.slot.replace(OrderedIndex::shared());
        trace!(
            txid = %self.tx.id(),
            store = self.name(),
            dropped = previous.read().physical_len(),
            "store truncated"
        );
        self.tx.record_undo(UndoAction::RestoreContainer {
            slot: Arc::clone(&self.slot),
            index: previous,
        });
        self.tx.stats().record_truncate();
        Ok(())
    }

    /// Returns the next value of this store's sequence counter.
    ///
    /// See [`Transaction::next_sequence`].
    pub fn next_sequence(&self) -> CoreResult<u64> {
        let result = self
            .tx
            .ensure_writable()
            .map(|()| self.tx.allocate_sequence(self.name()));
        self.tx.observe(result)
    }

    /// Creates an unpositioned iterator over the store's current container.
    ///
    /// Call [`StoreIterator::seek`] to position it.
    #[must_use]
    pub fn iter(&self, direction: Direction) -> StoreIterator<'t> {
        StoreIterator::new(self.tx, self.slot.current(), direction)
    }
}

impl std::fmt::Debug for Store<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name())
            .field("txid", &self.tx.id())
            .finish()
    }
}
