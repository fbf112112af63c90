//! Stress tests for ordkv.
//!
//! These tests verify behavior under heavy load and concurrent access.

use crate::fixtures::{scenarios::key_for, TEST_STORE};
use ordkv_core::{CoreError, Engine};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Size of values in bytes.
    pub value_size: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            value_size: 256,
            key_count: 1_000,
        }
    }
}

fn populate(engine: &Engine, config: &StressConfig) {
    let value = vec![0xABu8; config.value_size];
    let _ = engine.update(|tx| {
        let store = tx.store(TEST_STORE)?;
        for i in 0..config.key_count {
            store.put(key_for(i), &value)?;
        }
        Ok(())
    });
}

/// Run a sequential write stress test.
pub fn stress_sequential_writes(engine: &Engine, config: &StressConfig) -> StressTestResult {
    let value = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = key_for(i % config.key_count);
        match engine.update(|tx| tx.store(TEST_STORE)?.put(&key, &value)) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a sequential read stress test.
pub fn stress_sequential_reads(engine: &Engine, config: &StressConfig) -> StressTestResult {
    populate(engine, config);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = key_for(i % config.key_count);
        match engine.view(|tx| tx.store(TEST_STORE)?.get(&key)) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a mixed read/write stress test.
///
/// Reads and deletes of absent keys count as successful.
pub fn stress_mixed_operations(engine: &Engine, config: &StressConfig) -> StressTestResult {
    let value = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = key_for(i % config.key_count);

        let result = if i % 3 == 0 {
            // Write (33%)
            engine.update(|tx| tx.store(TEST_STORE)?.put(&key, &value))
        } else if i % 3 == 1 {
            // Read (33%)
            engine.view(|tx| tx.store(TEST_STORE)?.get(&key).map(drop))
        } else {
            // Delete (33%)
            engine.update(|tx| tx.store(TEST_STORE)?.delete(&key))
        };

        match result {
            Ok(()) | Err(CoreError::KeyNotFound) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent read stress test.
pub fn stress_concurrent_reads(engine: Arc<Engine>, config: &StressConfig) -> StressTestResult {
    populate(&engine, config);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let key_count = config.key_count;

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = key_for((t * ops_per_thread + i) % key_count);
                    match engine.view(|tx| tx.store(TEST_STORE)?.get(&key)) {
                        Ok(_) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run one writer against concurrent readers.
///
/// The writer keeps two keys equal inside each transaction; a reader that
/// ever sees them differ counts as a failed operation.
pub fn stress_reader_writer(engine: Arc<Engine>, config: &StressConfig) -> StressTestResult {
    let _ = engine.update(|tx| {
        let store = tx.store(TEST_STORE)?;
        store.put(b"left", 0u64.to_be_bytes())?;
        store.put(b"right", 0u64.to_be_bytes())
    });

    let done = Arc::new(AtomicBool::new(false));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let readers: Vec<_> = (0..config.threads.max(1))
        .map(|_| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let pair = engine.view(|tx| {
                        let store = tx.store(TEST_STORE)?;
                        Ok((store.get(b"left")?, store.get(b"right")?))
                    });
                    match pair {
                        Ok((left, right)) if left == right => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for i in 1..=config.operations as u64 {
        let result = engine.update(|tx| {
            let store = tx.store(TEST_STORE)?;
            store.put(b"left", i.to_be_bytes())?;
            store.put(b"right", i.to_be_bytes())
        });
        match result {
            Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
            Err(_) => failed.fetch_add(1, Ordering::Relaxed),
        };
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        reader.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a transaction rollback stress test.
///
/// Every other transaction fails on purpose; the store must end up holding
/// only the keys written by the committed ones.
pub fn stress_transaction_rollbacks(engine: &Engine, config: &StressConfig) -> StressTestResult {
    let value = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = key_for(i);
        let should_fail = i % 2 == 0;

        let result = engine.update(|tx| {
            tx.store(TEST_STORE)?.put(&key, &value)?;
            if should_fail {
                Err(CoreError::Cancelled)
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a large transaction stress test.
pub fn stress_large_transactions(engine: &Engine, config: &StressConfig) -> StressTestResult {
    let value = vec![0xABu8; config.value_size];
    let batch_size = 100; // keys per transaction

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for batch in 0..(config.operations / batch_size) {
        let result = engine.update(|tx| {
            let store = tx.store(TEST_STORE)?;
            for i in 0..batch_size {
                store.put(key_for(batch * batch_size + i), &value)?;
            }
            Ok(())
        });

        match result {
            Ok(()) => successful += batch_size,
            Err(_) => failed += batch_size,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
