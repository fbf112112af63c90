//! Benchmark utilities.

use ordkv_core::{Config, Engine};
use rand::Rng;

/// Store used by every benchmark.
pub const BENCH_STORE: &str = "bench";

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` distinct random keys of `len` bytes, in random order.
///
/// A 4-byte big-endian index suffix keeps the keys distinct.
pub fn random_keys(count: usize, len: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let mut key = random_data(len.saturating_sub(4));
            key.extend_from_slice(&(i as u32).to_be_bytes());
            key
        })
        .collect()
}

/// Creates an engine with the bench store.
pub fn bench_engine() -> Engine {
    Engine::with_config(Config::new().with_store(BENCH_STORE))
}

/// Creates an engine whose bench store holds `count` random pairs and
/// returns it with the keys.
pub fn populated_engine(count: usize, value_size: usize) -> (Engine, Vec<Vec<u8>>) {
    let engine = bench_engine();
    let keys = random_keys(count, 16);
    engine
        .update(|tx| {
            let store = tx.store(BENCH_STORE)?;
            for key in &keys {
                store.put(key, random_data(value_size))?;
            }
            Ok(())
        })
        .expect("Failed to populate engine");
    (engine, keys)
}
