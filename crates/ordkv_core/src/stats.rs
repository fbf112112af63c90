//! Engine statistics.
//!
//! Counters are updated with relaxed atomics and may be read while
//! transactions are in flight.
//!
//! ```rust
//! use ordkv_core::Engine;
//!
//! let engine = Engine::new();
//! engine.create_store("users").unwrap();
//! engine
//!     .update(|tx| tx.store("users")?.put(b"id:1", b"alice"))
//!     .unwrap();
//!
//! let stats = engine.stats();
//! assert_eq!(stats.puts, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    puts: AtomicU64,
    gets: AtomicU64,
    deletes: AtomicU64,
    truncates: AtomicU64,
    seeks: AtomicU64,
    sequences: AtomicU64,
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    transactions_started: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    errors: AtomicU64,
}

impl EngineStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_put(&self, bytes: usize) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_get(&self, bytes: usize) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_truncate(&self) {
        self.truncates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_seek(&self) {
        self.seeks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sequence(&self) {
        self.sequences.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_start(&self) {
        self.transactions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_rollback(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            puts: self.puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            truncates: self.truncates.load(Ordering::Relaxed),
            seeks: self.seeks.load(Ordering::Relaxed),
            sequences: self.sequences.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            transactions_started: self.transactions_started.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Successful puts.
    pub puts: u64,
    /// Successful gets.
    pub gets: u64,
    /// Successful deletes.
    pub deletes: u64,
    /// Successful truncates.
    pub truncates: u64,
    /// Iterator seeks.
    pub seeks: u64,
    /// Sequence numbers handed out.
    pub sequences: u64,
    /// Key and value bytes written by puts.
    pub bytes_written: u64,
    /// Value bytes returned by gets.
    pub bytes_read: u64,
    /// Transactions begun.
    pub transactions_started: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back, including implicit rollbacks on drop.
    pub transactions_rolled_back: u64,
    /// Operations that returned an error.
    pub errors: u64,
}
