//! Transactions over the engine's stores.
//!
//! The engine admits either one writable transaction or any number of
//! read-only transactions at a time. Writes are applied in place and undone
//! on rollback, so a transaction always reads its own writes.
//!
//! A transaction ends with exactly one successful [`Transaction::commit`] or
//! [`Transaction::rollback`]. Dropping an active transaction rolls it back.

mod log;
mod state;

pub(crate) use log::{CommitAction, TxLog, UndoAction};
pub use state::TransactionState;

use crate::cancel::Signal;
use crate::engine::Engine;
use crate::error::{CoreError, CoreResult};
use crate::stats::EngineStats;
use crate::store::Store;
use crate::types::TransactionId;
use parking_lot::{Mutex, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Engine lock held for the lifetime of a transaction.
///
/// Never read; dropping it releases the lock.
pub(crate) enum TxGuard<'e> {
    /// Held by read-only transactions.
    Shared { _guard: RwLockReadGuard<'e, ()> },
    /// Held by the writable transaction.
    Exclusive { _guard: RwLockWriteGuard<'e, ()> },
}

/// A transaction on an [`Engine`].
///
/// Created by [`Engine::begin`] or [`Engine::begin_with`]. Store handles and
/// iterators borrow the transaction, so they must be dropped before it can
/// be committed or rolled back.
pub struct Transaction<'e> {
    engine: &'e Engine,
    id: TransactionId,
    writable: bool,
    signal: Signal,
    state: TransactionState,
    log: Mutex<TxLog>,
    guard: Option<TxGuard<'e>>,
}

impl<'e> Transaction<'e> {
    pub(crate) fn new(
        engine: &'e Engine,
        id: TransactionId,
        writable: bool,
        signal: Signal,
        guard: TxGuard<'e>,
    ) -> Self {
        Self {
            engine,
            id,
            writable,
            signal,
            state: TransactionState::Active,
            log: Mutex::new(TxLog::default()),
            guard: Some(guard),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns true if the transaction may mutate stores.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Returns a handle to the store called `name`.
    ///
    /// # Errors
    ///
    /// - `StoreNotFound` if no such store exists
    /// - `TransactionClosed` if the transaction has ended
    /// - `Cancelled` / `DeadlineExceeded` if the transaction's signal fired
    pub fn store(&self, name: &str) -> CoreResult<Store<'_>> {
        let result = self.ensure_usable().and_then(|()| {
            self.engine
                .catalog()
                .get(name)
                .ok_or_else(|| CoreError::store_not_found(name))
        });
        let slot = self.observe(result)?;
        Ok(Store::new(self, slot))
    }

    /// Creates an empty store and returns a handle to it.
    ///
    /// The store is visible to later transactions once this one commits, and
    /// disappears again on rollback.
    ///
    /// # Errors
    ///
    /// - `StoreAlreadyExists` if the name is taken
    /// - `ReadOnlyTransaction` if the transaction is not writable
    pub fn create_store(&self, name: &str) -> CoreResult<Store<'_>> {
        let result = self.ensure_writable().and_then(|()| {
            self.engine
                .catalog()
                .create(name)
                .ok_or_else(|| CoreError::store_already_exists(name))
        });
        let slot = self.observe(result)?;
        self.record_undo(UndoAction::UncreateStore {
            slot: Arc::clone(&slot),
        });
        debug!(txid = %self.id, store = name, "store created");
        Ok(Store::new(self, slot))
    }

    /// Removes the store called `name` with all its keys.
    ///
    /// Its sequence counter is kept; a store recreated under the same name
    /// continues from where it left off.
    ///
    /// # Errors
    ///
    /// - `StoreNotFound` if no such store exists
    /// - `ReadOnlyTransaction` if the transaction is not writable
    pub fn drop_store(&self, name: &str) -> CoreResult<()> {
        let result = self.ensure_writable().and_then(|()| {
            self.engine
                .catalog()
                .remove(name)
                .ok_or_else(|| CoreError::store_not_found(name))
        });
        let slot = self.observe(result)?;
        self.record_undo(UndoAction::RestoreStore { slot });
        debug!(txid = %self.id, store = name, "store dropped");
        Ok(())
    }

    /// Returns the names of all stores in ascending order.
    pub fn store_names(&self) -> CoreResult<Vec<String>> {
        let result = self.ensure_usable().map(|()| self.engine.catalog().names());
        self.observe(result)
    }

    /// Returns the next value of the sequence counter of store `name`.
    ///
    /// Counters start at 1 and are shared by all transactions. They are not
    /// rolled back: a value handed to a transaction that later rolls back is
    /// never handed out again.
    ///
    /// # Errors
    ///
    /// - `StoreNotFound` if no such store exists
    /// - `ReadOnlyTransaction` if the transaction is not writable
    pub fn next_sequence(&self, name: &str) -> CoreResult<u64> {
        let result = self.ensure_writable().and_then(|()| {
            if self.engine.catalog().contains(name) {
                Ok(self.allocate_sequence(name))
            } else {
                Err(CoreError::store_not_found(name))
            }
        });
        self.observe(result)
    }

    /// Makes the transaction's effects permanent and releases the engine
    /// lock.
    ///
    /// Deleted entries are physically removed at this point.
    ///
    /// # Errors
    ///
    /// - `TransactionClosed` if the transaction has already ended
    /// - `Cancelled` / `DeadlineExceeded` if the signal fired; nothing is
    ///   applied and the transaction stays active so it can be rolled back
    pub fn commit(&mut self) -> CoreResult<()> {
        self.state.ensure_active()?;
        if let Err(err) = self.signal.check() {
            self.stats().record_error();
            debug!(txid = %self.id, error = %err, "commit refused");
            return Err(err);
        }

        let log = std::mem::take(self.log.get_mut());
        let deferred = log.commit_len();
        let purged = log.commit();
        self.finish(TransactionState::Committed);
        self.stats().record_transaction_commit();
        debug!(txid = %self.id, deferred, purged, "transaction committed");
        Ok(())
    }

    /// Undoes every mutation made by the transaction and releases the engine
    /// lock.
    ///
    /// Rollback ignores the cancellation signal.
    ///
    /// # Errors
    ///
    /// Returns `TransactionClosed` if the transaction has already ended.
    pub fn rollback(&mut self) -> CoreResult<()> {
        self.state.ensure_active()?;
        self.abort();
        Ok(())
    }

    fn abort(&mut self) {
        let log = std::mem::take(self.log.get_mut());
        let undone = log.rollback(self.engine.catalog());
        self.finish(TransactionState::RolledBack);
        self.stats().record_transaction_rollback();
        debug!(txid = %self.id, undone, "transaction rolled back");
    }

    fn finish(&mut self, state: TransactionState) {
        self.state = state;
        drop(self.guard.take());
    }

    /// Fails unless the transaction is active and its signal has not fired.
    pub(crate) fn ensure_usable(&self) -> CoreResult<()> {
        self.state.ensure_active()?;
        self.signal.check()
    }

    /// Like [`Self::ensure_usable`], and also fails for read-only
    /// transactions.
    pub(crate) fn ensure_writable(&self) -> CoreResult<()> {
        self.ensure_usable()?;
        if self.writable {
            Ok(())
        } else {
            Err(CoreError::ReadOnlyTransaction)
        }
    }

    pub(crate) fn check_signal(&self) -> CoreResult<()> {
        self.signal.check()
    }

    pub(crate) fn allocate_sequence(&self, name: &str) -> u64 {
        let seq = self.engine.catalog().next_sequence(name);
        self.stats().record_sequence();
        trace!(txid = %self.id, store = name, seq, "sequence allocated");
        seq
    }

    pub(crate) fn record_undo(&self, action: UndoAction) {
        self.log.lock().record_undo(action);
    }

    pub(crate) fn record_commit(&self, action: CommitAction) {
        self.log.lock().record_commit(action);
    }

    pub(crate) fn stats(&self) -> &EngineStats {
        self.engine.metrics()
    }

    /// Counts failed operations.
    pub(crate) fn observe<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        if result.is_err() {
            self.stats().record_error();
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn undo_len(&self) -> usize {
        self.log.lock().undo_len()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state.is_active() {
            warn!(txid = %self.id, "transaction dropped while active, rolling back");
            self.abort();
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("writable", &self.writable)
            .field("state", &self.state)
            .field("log", &*self.log.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{CancelToken, CoreError, Engine, TransactionState, TxOptions};
    use std::time::Duration;

    fn engine() -> Engine {
        let engine = Engine::new();
        engine.create_store("s").unwrap();
        engine
    }

    #[test]
    fn new_transaction_is_active() {
        let engine = engine();
        let tx = engine.begin(true).unwrap();
        assert!(tx.is_active());
        assert!(tx.is_writable());
        assert_eq!(tx.state(), TransactionState::Active);
    }

    #[test]
    fn cannot_commit_twice() {
        let engine = engine();
        let mut tx = engine.begin(true).unwrap();
        tx.commit().unwrap();
        assert_eq!(tx.state(), TransactionState::Committed);
        assert!(matches!(tx.commit(), Err(CoreError::TransactionClosed)));
        assert!(matches!(tx.rollback(), Err(CoreError::TransactionClosed)));
    }

    #[test]
    fn cannot_use_after_rollback() {
        let engine = engine();
        let mut tx = engine.begin(true).unwrap();
        tx.rollback().unwrap();
        assert_eq!(tx.state(), TransactionState::RolledBack);
        assert!(matches!(tx.rollback(), Err(CoreError::TransactionClosed)));
        assert!(matches!(tx.commit(), Err(CoreError::TransactionClosed)));
        assert!(matches!(tx.store("s"), Err(CoreError::TransactionClosed)));
    }

    #[test]
    fn read_only_transaction_commits() {
        let engine = engine();
        let mut tx = engine.begin(false).unwrap();
        assert!(!tx.is_writable());
        tx.commit().unwrap();
    }

    #[test]
    fn drop_rolls_back() {
        let engine = engine();
        {
            let tx = engine.begin(true).unwrap();
            tx.store("s").unwrap().put(b"a", b"1").unwrap();
        }
        let len = engine.view(|tx| tx.store("s")?.len()).unwrap();
        assert_eq!(len, 0);
        assert_eq!(engine.stats().transactions_rolled_back, 1);
    }

    #[test]
    fn store_not_found() {
        let engine = engine();
        let tx = engine.begin(false).unwrap();
        assert!(matches!(
            tx.store("missing"),
            Err(CoreError::StoreNotFound { name }) if name == "missing"
        ));
    }

    #[test]
    fn create_store_rolls_back() {
        let engine = engine();
        let mut tx = engine.begin(true).unwrap();
        tx.create_store("new").unwrap().put(b"k", b"v").unwrap();
        assert!(matches!(
            tx.create_store("new"),
            Err(CoreError::StoreAlreadyExists { .. })
        ));
        assert_eq!(tx.store_names().unwrap(), vec!["new", "s"]);
        tx.rollback().unwrap();

        assert!(!engine.has_store("new"));
    }

    #[test]
    fn drop_store_rolls_back_with_contents() {
        let engine = engine();
        engine.update(|tx| tx.store("s")?.put(b"k", b"v")).unwrap();

        let mut tx = engine.begin(true).unwrap();
        tx.drop_store("s").unwrap();
        assert!(matches!(tx.store("s"), Err(CoreError::StoreNotFound { .. })));
        tx.create_store("s").unwrap();
        tx.rollback().unwrap();

        let value = engine.view(|tx| tx.store("s")?.get(b"k")).unwrap();
        assert_eq!(value.as_ref(), b"v");
    }

    #[test]
    fn store_ddl_requires_writable() {
        let engine = engine();
        let tx = engine.begin(false).unwrap();
        assert!(matches!(
            tx.create_store("x"),
            Err(CoreError::ReadOnlyTransaction)
        ));
        assert!(matches!(
            tx.drop_store("s"),
            Err(CoreError::ReadOnlyTransaction)
        ));
    }

    #[test]
    fn sequences_survive_rollback() {
        let engine = engine();
        let mut tx = engine.begin(true).unwrap();
        assert_eq!(tx.next_sequence("s").unwrap(), 1);
        assert_eq!(tx.store("s").unwrap().next_sequence().unwrap(), 2);
        tx.rollback().unwrap();

        let mut tx = engine.begin(true).unwrap();
        assert_eq!(tx.next_sequence("s").unwrap(), 3);
        assert!(matches!(
            tx.next_sequence("missing"),
            Err(CoreError::StoreNotFound { .. })
        ));
        tx.commit().unwrap();
    }

    #[test]
    fn cancelled_next_sequence_does_not_advance() {
        let engine = engine();
        let token = CancelToken::new();
        let mut tx = engine
            .begin_with(TxOptions::writable().with_cancel(token.clone()))
            .unwrap();
        {
            let store = tx.store("s").unwrap();
            token.cancel();
            assert!(matches!(store.next_sequence(), Err(CoreError::Cancelled)));
        }
        assert!(matches!(tx.next_sequence("s"), Err(CoreError::Cancelled)));
        tx.rollback().unwrap();

        let mut tx = engine.begin(true).unwrap();
        assert_eq!(tx.next_sequence("s").unwrap(), 1);
        tx.commit().unwrap();
        assert_eq!(engine.stats().sequences, 1);
    }

    #[test]
    fn failed_store_names_counts_as_error() {
        let engine = engine();
        let token = CancelToken::new();
        let tx = engine
            .begin_with(TxOptions::read_only().with_cancel(token.clone()))
            .unwrap();
        token.cancel();

        let before = engine.stats().errors;
        assert!(matches!(tx.store_names(), Err(CoreError::Cancelled)));
        assert_eq!(engine.stats().errors, before + 1);
    }

    #[test]
    fn commit_refused_after_cancel() {
        let engine = engine();
        let token = CancelToken::new();
        let mut tx = engine
            .begin_with(TxOptions::writable().with_cancel(token.clone()))
            .unwrap();
        tx.store("s").unwrap().put(b"a", b"1").unwrap();

        token.cancel();
        assert!(matches!(tx.commit(), Err(CoreError::Cancelled)));
        assert!(tx.is_active());
        tx.rollback().unwrap();

        let len = engine.view(|tx| tx.store("s")?.len()).unwrap();
        assert_eq!(len, 0);
    }

    #[test]
    fn deadline_fails_operations() {
        let engine = engine();
        let mut tx = engine
            .begin_with(TxOptions::writable().with_timeout(Duration::ZERO))
            .unwrap();
        assert!(matches!(tx.store("s"), Err(CoreError::DeadlineExceeded)));
        assert!(matches!(tx.commit(), Err(CoreError::DeadlineExceeded)));
        tx.rollback().unwrap();
    }
}
