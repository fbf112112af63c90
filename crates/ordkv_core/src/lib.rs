//! # ordkv Core
//!
//! In-memory, transactional, ordered key-value engine.
//!
//! This crate provides:
//! - Named stores mapping byte keys to byte values in byte-wise order
//! - Transactions with rollback, read-your-own-writes and a single writer
//! - Forward and reverse cursors with seek semantics
//! - Per-store sequence counters
//! - Cancellation tokens and deadlines checked by every operation
//!
//! ```rust
//! use ordkv_core::{Direction, Engine};
//!
//! let engine = Engine::new();
//! engine.create_store("fruit")?;
//!
//! let mut tx = engine.begin(true)?;
//! {
//!     let fruit = tx.store("fruit")?;
//!     fruit.put(b"apple", b"red")?;
//!     fruit.put(b"banana", b"yellow")?;
//!
//!     let mut it = fruit.iter(Direction::Forward);
//!     it.seek(b"b");
//!     assert_eq!(it.item().map(|item| item.key().to_vec()), Some(b"banana".to_vec()));
//! }
//! tx.commit()?;
//! # Ok::<(), ordkv_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod catalog;
mod config;
mod engine;
mod error;
mod iterator;
mod stats;
mod store;
mod transaction;
mod types;

pub use cancel::{CancelToken, TxOptions};
pub use config::Config;
pub use engine::Engine;
pub use error::{CoreError, CoreResult};
pub use iterator::StoreIterator;
pub use stats::{EngineStats, StatsSnapshot};
pub use store::Store;
pub use transaction::{Transaction, TransactionState};
pub use types::{Direction, Item, TransactionId};

pub use bytes::Bytes;
