//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that respects the engine's input rules (non-empty keys and values).

use proptest::prelude::*;

/// Strategy for generating keys.
///
/// Keys are short and drawn from a small alphabet so that generated
/// operation sequences hit the same keys often.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![0u8, b'a', b'b', b'c', 0xff]), 1..4)
}

/// Strategy for generating arbitrary non-empty keys.
pub fn wide_key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..32)
}

/// Strategy for generating non-empty values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..64)
}

/// Strategy for generating store names.
pub fn store_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// An operation on a single store.
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Insert or overwrite a key.
    Put {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Delete a key.
    Delete {
        /// Key
        key: Vec<u8>,
    },
    /// Read a key.
    Get {
        /// Key
        key: Vec<u8>,
    },
    /// Remove every key.
    Truncate,
    /// Draw a sequence number.
    NextSequence,
}

impl StoreOp {
    /// Returns true if the operation mutates the store.
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreOp::Get { .. })
    }
}

/// Strategy for generating store operations.
pub fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        6 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| StoreOp::Put { key, value }),
        3 => key_strategy().prop_map(|key| StoreOp::Delete { key }),
        2 => key_strategy().prop_map(|key| StoreOp::Get { key }),
        1 => Just(StoreOp::Truncate),
        1 => Just(StoreOp::NextSequence),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn op_sequence_strategy(min_ops: usize, max_ops: usize) -> impl Strategy<Value = Vec<StoreOp>> {
    prop::collection::vec(store_op_strategy(), min_ops..max_ops)
}

/// Strategy for generating a set of initial key-value pairs.
pub fn seed_strategy() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    prop::collection::vec((key_strategy(), value_strategy()), 0..16)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
