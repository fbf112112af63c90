//! The engine: store catalog, transaction lock and lifecycle.

use crate::cancel::{Signal, TxOptions};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::stats::{EngineStats, StatsSnapshot};
use crate::transaction::{Transaction, TxGuard};
use crate::types::TransactionId;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;

/// An in-memory, transactional, ordered key-value engine.
///
/// The engine holds a set of named stores. All access goes through
/// transactions: any number of read-only transactions may run at once, or a
/// single writable one. Writable transactions exclude readers for their whole
/// lifetime.
///
/// # Example
///
/// ```rust
/// use ordkv_core::{Config, Engine};
///
/// let engine = Engine::with_config(Config::new().with_store("users"));
///
/// engine.update(|tx| {
///     let users = tx.store("users")?;
///     let id = users.next_sequence()?;
///     users.put(format!("user:{id}"), b"alice")
/// })?;
///
/// let value = engine.view(|tx| tx.store("users")?.get(b"user:1"))?;
/// assert_eq!(value.as_ref(), b"alice");
/// # Ok::<(), ordkv_core::CoreError>(())
/// ```
///
/// # Locking
///
/// Beginning a transaction blocks while a conflicting one is active. A thread
/// that begins a second transaction while still holding a conflicting one
/// waits on itself; set [`Config::writer_wait`] to turn that wait into a
/// `LockTimeout` error.
pub struct Engine {
    config: Config,
    catalog: Catalog,
    txn_lock: RwLock<()>,
    next_txid: AtomicU64,
    stats: EngineStats,
    is_open: RwLock<bool>,
}

impl Engine {
    /// Creates an engine with no stores.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an engine with the given configuration.
    ///
    /// Stores named in `config.stores` are created up front; duplicate names
    /// are created once.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let catalog = Catalog::default();
        for name in &config.stores {
            catalog.create(name);
        }
        debug!(stores = config.stores.len(), "engine created");
        Self {
            config,
            catalog,
            txn_lock: RwLock::new(()),
            next_txid: AtomicU64::new(1),
            stats: EngineStats::new(),
            is_open: RwLock::new(true),
        }
    }

    /// Begins a transaction with default options.
    ///
    /// # Errors
    ///
    /// - `EngineClosed` if the engine has been closed
    /// - `LockTimeout` if [`Config::writer_wait`] elapsed first
    pub fn begin(&self, writable: bool) -> CoreResult<Transaction<'_>> {
        let options = if writable {
            TxOptions::writable()
        } else {
            TxOptions::read_only()
        };
        self.begin_with(options)
    }

    /// Begins a transaction with explicit options.
    ///
    /// Without an explicit deadline, [`Config::default_timeout`] applies.
    pub fn begin_with(&self, options: TxOptions) -> CoreResult<Transaction<'_>> {
        self.ensure_open()?;
        let guard = self.acquire(options.writable)?;
        // close() may have run while we waited for the lock
        self.ensure_open()?;

        let deadline = options.deadline.or_else(|| {
            self.config
                .default_timeout
                .and_then(|timeout| Instant::now().checked_add(timeout))
        });
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        self.stats.record_transaction_start();
        debug!(txid = %id, writable = options.writable, "transaction started");

        Ok(Transaction::new(
            self,
            id,
            options.writable,
            Signal::new(options.cancel, deadline),
            guard,
        ))
    }

    fn acquire(&self, writable: bool) -> CoreResult<TxGuard<'_>> {
        let Some(wait) = self.config.writer_wait else {
            return Ok(if writable {
                TxGuard::Exclusive {
                    _guard: self.txn_lock.write(),
                }
            } else {
                TxGuard::Shared {
                    _guard: self.txn_lock.read(),
                }
            });
        };

        let guard = if writable {
            self.txn_lock
                .try_write_for(wait)
                .map(|_guard| TxGuard::Exclusive { _guard })
        } else {
            self.txn_lock
                .try_read_for(wait)
                .map(|_guard| TxGuard::Shared { _guard })
        };
        guard.ok_or_else(|| {
            self.stats.record_error();
            debug!(?wait, writable, "timed out waiting for transaction lock");
            CoreError::LockTimeout { waited: wait }
        })
    }

    /// Runs `f` in a writable transaction.
    ///
    /// The transaction commits if `f` returns `Ok` and rolls back otherwise.
    pub fn update<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CoreResult<T>,
    {
        let mut tx = self.begin(true)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback()?;
                Err(err)
            }
        }
    }

    /// Runs `f` in a read-only transaction.
    pub fn view<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CoreResult<T>,
    {
        let mut tx = self.begin(false)?;
        let result = f(&tx);
        tx.commit()?;
        result
    }

    /// Creates a store in its own writable transaction.
    pub fn create_store(&self, name: &str) -> CoreResult<()> {
        self.update(|tx| tx.create_store(name).map(drop))
    }

    /// Drops a store in its own writable transaction.
    pub fn drop_store(&self, name: &str) -> CoreResult<()> {
        self.update(|tx| tx.drop_store(name))
    }

    /// Checks if a store exists, without taking the transaction lock.
    ///
    /// Stores created by an uncommitted transaction are already reported.
    #[must_use]
    pub fn has_store(&self, name: &str) -> bool {
        self.catalog.contains(name)
    }

    /// Returns a snapshot of the engine's counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns engine configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Closes the engine and releases every store.
    ///
    /// Waits for active transactions to end. Afterwards every `begin` fails
    /// with `EngineClosed`. Closing twice is a no-op.
    pub fn close(&self) -> CoreResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let _exclusive = self.txn_lock.write();
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        self.catalog.clear();
        *is_open = false;
        debug!("engine closed");
        Ok(())
    }

    /// Checks if the engine is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::EngineClosed)
        }
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn metrics(&self) -> &EngineStats {
        &self.stats
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("is_open", &self.is_open())
            .field("stores", &self.catalog.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CancelToken, Direction};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn create_engine() -> Engine {
        Engine::with_config(Config::new().with_store("s"))
    }

    fn keys(tx: &Transaction<'_>, store: &str) -> Vec<Vec<u8>> {
        let store = tx.store(store).unwrap();
        let mut it = store.iter(Direction::Forward);
        it.rewind();
        let mut keys = Vec::new();
        while let Some(item) = it.item() {
            keys.push(item.key().to_vec());
            it.next();
        }
        keys
    }

    #[test]
    fn configured_stores_exist() {
        let engine = Engine::with_config(Config::new().with_store("a").with_store("a"));
        assert!(engine.has_store("a"));
        assert!(!engine.has_store("b"));
        assert!(engine.is_open());
    }

    #[test]
    fn transaction_ids_increase() {
        let engine = create_engine();
        let first = engine.begin(false).unwrap().id();
        let second = engine.begin(false).unwrap().id();
        assert!(first < second);
    }

    #[test]
    fn deleted_key_hidden_from_iterator_until_rollback() {
        let engine = create_engine();
        engine
            .update(|tx| {
                let store = tx.store("s")?;
                store.put(b"a", b"1")?;
                store.put(b"b", b"2")
            })
            .unwrap();

        let mut tx = engine.begin(true).unwrap();
        {
            let store = tx.store("s").unwrap();
            store.delete(b"a").unwrap();
            let mut it = store.iter(Direction::Forward);
            it.rewind();
            let item = it.item().unwrap();
            assert_eq!((item.key(), item.value()), (&b"b"[..], &b"2"[..]));
            it.next();
            assert!(!it.valid());
        }
        tx.rollback().unwrap();

        let value = engine.view(|tx| tx.store("s")?.get(b"a")).unwrap();
        assert_eq!(value.as_ref(), b"1");
    }

    #[test]
    fn truncate_rollback_restores_committed_items() {
        let engine = create_engine();
        engine
            .update(|tx| {
                let store = tx.store("s")?;
                for i in 0..10u8 {
                    store.put([b'k', i], [i + 1])?;
                }
                Ok(())
            })
            .unwrap();

        let mut tx = engine.begin(true).unwrap();
        tx.store("s").unwrap().truncate().unwrap();
        tx.rollback().unwrap();

        engine
            .view(|tx| {
                let store = tx.store("s")?;
                assert_eq!(store.len()?, 10);
                for i in 0..10u8 {
                    assert_eq!(store.get([b'k', i])?.as_ref(), &[i + 1]);
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn scenario_rollback_of_mixed_writes() {
        let engine = create_engine();
        engine
            .update(|tx| {
                let store = tx.store("s")?;
                store.put(b"a", b"1")?;
                store.put(b"b", b"2")
            })
            .unwrap();

        let mut tx = engine.begin(true).unwrap();
        {
            let store = tx.store("s").unwrap();
            store.put(b"c", b"3").unwrap();
            store.delete(b"a").unwrap();
            store.put(b"b", b"20").unwrap();
            assert_eq!(keys(&tx, "s"), vec![b"b".to_vec(), b"c".to_vec()]);
        }
        tx.rollback().unwrap();

        engine
            .view(|tx| {
                assert_eq!(keys(tx, "s"), vec![b"a".to_vec(), b"b".to_vec()]);
                let store = tx.store("s")?;
                assert_eq!(store.get(b"a")?.as_ref(), b"1");
                assert_eq!(store.get(b"b")?.as_ref(), b"2");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn scenario_commit_of_mixed_writes() {
        let engine = create_engine();
        engine
            .update(|tx| {
                let store = tx.store("s")?;
                store.put(b"a", b"1")?;
                store.put(b"b", b"2")
            })
            .unwrap();

        engine
            .update(|tx| {
                let store = tx.store("s")?;
                store.put(b"c", b"3")?;
                store.delete(b"a")?;
                store.put(b"b", b"20")
            })
            .unwrap();

        engine
            .view(|tx| {
                assert_eq!(keys(tx, "s"), vec![b"b".to_vec(), b"c".to_vec()]);
                assert_eq!(tx.store("s")?.get(b"b")?.as_ref(), b"20");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn update_rolls_back_on_error() {
        let engine = create_engine();
        let result: CoreResult<()> = engine.update(|tx| {
            tx.store("s")?.put(b"a", b"1")?;
            Err(CoreError::KeyNotFound)
        });
        assert!(matches!(result, Err(CoreError::KeyNotFound)));

        let len = engine.view(|tx| tx.store("s")?.len()).unwrap();
        assert_eq!(len, 0);
    }

    #[test]
    fn create_and_drop_store() {
        let engine = Engine::new();
        engine.create_store("x").unwrap();
        assert!(matches!(
            engine.create_store("x"),
            Err(CoreError::StoreAlreadyExists { .. })
        ));
        engine.drop_store("x").unwrap();
        assert!(!engine.has_store("x"));
        assert!(matches!(
            engine.drop_store("x"),
            Err(CoreError::StoreNotFound { .. })
        ));
    }

    #[test]
    fn default_timeout_applies() {
        let engine = Engine::with_config(
            Config::new()
                .with_store("s")
                .default_timeout(Duration::ZERO),
        );
        let tx = engine.begin(false).unwrap();
        assert!(matches!(tx.store("s"), Err(CoreError::DeadlineExceeded)));
    }

    #[test]
    fn explicit_deadline_overrides_default() {
        let engine = Engine::with_config(
            Config::new()
                .with_store("s")
                .default_timeout(Duration::ZERO),
        );
        let tx = engine
            .begin_with(TxOptions::read_only().with_timeout(Duration::from_secs(60)))
            .unwrap();
        assert!(tx.store("s").is_ok());
    }

    #[test]
    fn unbounded_timeouts_never_expire() {
        let engine = Engine::with_config(
            Config::new()
                .with_store("s")
                .default_timeout(Duration::MAX),
        );
        engine
            .update(|tx| tx.store("s")?.put(b"k", b"v"))
            .unwrap();

        let tx = engine
            .begin_with(TxOptions::read_only().with_timeout(Duration::MAX))
            .unwrap();
        assert_eq!(tx.store("s").unwrap().get(b"k").unwrap().as_ref(), b"v");
    }

    #[test]
    fn writer_wait_times_out() {
        let engine = Engine::with_config(
            Config::new()
                .with_store("s")
                .writer_wait(Duration::from_millis(20)),
        );
        let _reader = engine.begin(false).unwrap();

        let err = engine.begin(true).unwrap_err();
        assert!(matches!(err, CoreError::LockTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn readers_run_concurrently() {
        let engine = Arc::new(create_engine());
        engine.update(|tx| tx.store("s")?.put(b"k", b"v")).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    engine
                        .view(|tx| tx.store("s")?.get(b"k"))
                        .map(|value| value.to_vec())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), b"v".to_vec());
        }
    }

    #[test]
    fn writer_waits_for_reader() {
        let engine = Arc::new(create_engine());
        let reader = engine.begin(false).unwrap();

        let writer = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.update(|tx| tx.store("s")?.put(b"k", b"v")))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!writer.is_finished());

        drop(reader);
        writer.join().unwrap().unwrap();
        assert_eq!(
            engine.view(|tx| tx.store("s")?.get(b"k")).unwrap().as_ref(),
            b"v"
        );
    }

    #[test]
    fn close_rejects_new_transactions() {
        let engine = create_engine();
        engine.close().unwrap();
        engine.close().unwrap();
        assert!(!engine.is_open());
        assert!(matches!(engine.begin(false), Err(CoreError::EngineClosed)));
        assert!(!engine.has_store("s"));
    }

    #[test]
    fn cancelled_update_commits_nothing() {
        let engine = create_engine();
        let token = CancelToken::new();
        let mut tx = engine
            .begin_with(TxOptions::writable().with_cancel(token.clone()))
            .unwrap();
        tx.store("s").unwrap().put(b"a", b"1").unwrap();
        token.cancel();
        assert!(tx.commit().is_err());
        drop(tx);

        assert_eq!(engine.view(|tx| tx.store("s")?.len()).unwrap(), 0);
    }

    #[test]
    fn stats_track_operations() {
        let engine = create_engine();
        engine.update(|tx| tx.store("s")?.put(b"k", b"value")).unwrap();
        let _ = engine.view(|tx| tx.store("s")?.get(b"missing"));

        let stats = engine.stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.bytes_written, 6);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.transactions_started, 2);
        assert_eq!(stats.transactions_committed, 2);
    }
}
