//! Error types for ordkv core.

use std::time::Duration;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ordkv core operations.
///
/// Every failing operation leaves no partial mutation behind: validation
/// happens before anything is written to a store or to a transaction log.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A write was attempted under a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnlyTransaction,

    /// The key is absent or has been deleted in the current transaction.
    #[error("key not found")]
    KeyNotFound,

    /// A put was given a zero-length key.
    #[error("empty keys are forbidden")]
    EmptyKey,

    /// A put was given a zero-length value.
    #[error("empty values are forbidden")]
    EmptyValue,

    /// The transaction's cancellation token was triggered.
    #[error("operation cancelled")]
    Cancelled,

    /// The transaction's deadline has passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The transaction has already been committed or rolled back.
    #[error("transaction closed")]
    TransactionClosed,

    /// No store exists under the given name.
    #[error("store not found: {name}")]
    StoreNotFound {
        /// Name of the store.
        name: String,
    },

    /// A store already exists under the given name.
    #[error("store already exists: {name}")]
    StoreAlreadyExists {
        /// Name of the store.
        name: String,
    },

    /// The engine has been closed.
    #[error("engine is closed")]
    EngineClosed,

    /// Waiting for the transaction lock took longer than configured.
    #[error("timed out after {waited:?} waiting for the transaction lock")]
    LockTimeout {
        /// How long the caller waited.
        waited: Duration,
    },
}

impl CoreError {
    /// Creates a store not found error.
    pub fn store_not_found(name: impl Into<String>) -> Self {
        Self::StoreNotFound { name: name.into() }
    }

    /// Creates a store already exists error.
    pub fn store_already_exists(name: impl Into<String>) -> Self {
        Self::StoreAlreadyExists { name: name.into() }
    }

    /// Returns true if the operation may succeed when retried unchanged.
    ///
    /// The engine never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::LockTimeout { .. })
    }

    /// Returns true for errors raised by a cancellation signal or deadline.
    pub fn is_signal(&self) -> bool {
        matches!(self, CoreError::Cancelled | CoreError::DeadlineExceeded)
    }
}
