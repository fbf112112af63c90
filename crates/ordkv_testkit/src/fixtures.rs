//! Test fixtures and engine helpers.
//!
//! Provides convenience functions for setting up test engines
//! and common test scenarios.

use ordkv_core::{Config, Direction, Engine, StoreIterator, Transaction};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Name of the store every [`TestEngine`] starts with.
pub const TEST_STORE: &str = "test";

/// An engine preloaded with the [`TEST_STORE`] store.
pub struct TestEngine {
    /// The engine instance.
    pub engine: Engine,
}

impl TestEngine {
    /// Creates an engine with the test store.
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Creates an engine with the test store plus `names`.
    pub fn with_stores(names: &[&str]) -> Self {
        let config = names
            .iter()
            .fold(Config::new(), |config, name| config.with_store(*name));
        Self::with_config(config)
    }

    /// Creates an engine from `config`, adding the test store.
    pub fn with_config(config: Config) -> Self {
        init_tracing();
        Self {
            engine: Engine::with_config(config.with_store(TEST_STORE)),
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestEngine {
    type Target = Engine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// Runs a test with a fresh engine holding the test store.
///
/// # Example
///
/// ```rust
/// use ordkv_testkit::{with_engine, TEST_STORE};
///
/// with_engine(|engine| {
///     engine
///         .update(|tx| tx.store(TEST_STORE)?.put(b"k", b"v"))
///         .unwrap();
/// });
/// ```
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&Engine) -> R,
{
    let test_engine = TestEngine::new();
    f(&test_engine.engine)
}

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Drains a positioned iterator into `(key, value)` pairs.
pub fn drain(it: &mut StoreIterator<'_>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut items = Vec::new();
    while let Some(item) = it.item() {
        items.push((item.key().to_vec(), item.value().to_vec()));
        it.next();
    }
    items
}

/// Returns every live pair of `store` in `direction` order.
///
/// # Panics
///
/// Panics if the store does not exist or the transaction is unusable.
pub fn scan(tx: &Transaction<'_>, store: &str, direction: Direction) -> Vec<(Vec<u8>, Vec<u8>)> {
    let store = tx.store(store).expect("Failed to open store");
    let mut it = store.iter(direction);
    it.rewind();
    drain(&mut it)
}

/// Returns every live key of `store` in ascending order.
pub fn scan_keys(tx: &Transaction<'_>, store: &str) -> Vec<Vec<u8>> {
    scan(tx, store, Direction::Forward)
        .into_iter()
        .map(|(key, _)| key)
        .collect()
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Fixed-width key for index `i`, so byte order matches numeric order.
    pub fn key_for(i: usize) -> Vec<u8> {
        format!("key:{i:08}").into_bytes()
    }

    /// Creates an engine whose test store holds `count` keys.
    pub fn populated_engine(count: usize) -> TestEngine {
        let test_engine = TestEngine::new();
        test_engine
            .update(|tx| {
                let store = tx.store(TEST_STORE)?;
                for i in 0..count {
                    store.put(key_for(i), format!(r#"{{"index":{i}}}"#))?;
                }
                Ok(())
            })
            .expect("Failed to populate store");
        test_engine
    }

    /// Creates an engine with `store_count` stores holding one key each.
    pub fn multi_store_engine(store_count: usize) -> (TestEngine, Vec<String>) {
        let names: Vec<String> = (0..store_count).map(|i| format!("store_{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let test_engine = TestEngine::with_stores(&refs);

        for name in &names {
            test_engine
                .update(|tx| tx.store(name)?.put(b"only", name.as_bytes()))
                .expect("Failed to put key");
        }

        (test_engine, names)
    }
}
