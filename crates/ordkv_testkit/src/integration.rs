//! Integration test helpers.
//!
//! [`IntegrationHarness`] drives an engine and a [`ModelStore`] side by side,
//! verifying after every step that the engine agrees with the model.

use crate::fixtures::{scan, TestEngine, TEST_STORE};
use crate::generators::StoreOp;
use crate::model::{apply_op, ModelStore, Outcome};
use ordkv_core::{CoreError, CoreResult, Direction, Engine};

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The engine under test.
    pub engine: TestEngine,
    /// Expected committed state of the test store.
    model: ModelStore,
}

impl IntegrationHarness {
    /// Creates a harness with an empty test store.
    pub fn new() -> Self {
        Self {
            engine: TestEngine::new(),
            model: ModelStore::new(),
        }
    }

    /// Applies `ops` in one transaction and commits it.
    ///
    /// Every outcome must match the model's.
    pub fn commit(&mut self, ops: &[StoreOp]) {
        let mut expected = self.model.clone();
        self.engine
            .update(|tx| {
                let store = tx.store(TEST_STORE)?;
                for op in ops {
                    let want = expected.apply(op);
                    let got = apply_op(&store, op)?;
                    assert_eq!(got, want, "Outcome mismatch for {:?}", op);
                }
                Ok(())
            })
            .expect("Failed to commit transaction");
        self.model = expected;
    }

    /// Applies `ops` in one transaction and rolls it back.
    ///
    /// Outcomes inside the transaction must match the model's; afterwards
    /// only the sequence counter may have moved.
    pub fn rollback(&mut self, ops: &[StoreOp]) {
        let mut expected = self.model.clone();
        let result: CoreResult<()> = self.engine.update(|tx| {
            let store = tx.store(TEST_STORE)?;
            for op in ops {
                let want = expected.apply(op);
                let got = apply_op(&store, op)?;
                assert_eq!(got, want, "Outcome mismatch for {:?}", op);
            }
            Err(CoreError::Cancelled)
        });
        assert!(matches!(result, Err(CoreError::Cancelled)));
        let snapshot = self.model.clone();
        expected.rollback_to(&snapshot);
        self.model = expected;
    }

    /// Verifies the committed store contents in both directions.
    pub fn verify(&self) {
        for direction in [Direction::Forward, Direction::Reverse] {
            let actual = self
                .engine
                .view(|tx| Ok(scan(tx, TEST_STORE, direction)))
                .expect("Failed to scan store");
            assert_eq!(actual, self.model.pairs(direction), "{:?} scan", direction);
        }
    }

    /// Returns the model of the committed state.
    pub fn model(&self) -> &ModelStore {
        &self.model
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Transaction integration checks.
pub mod transaction {
    use super::*;

    /// Checks that a failed `update` leaves the store untouched.
    pub fn test_transaction_rollback(engine: &Engine) {
        engine
            .update(|tx| tx.store(TEST_STORE)?.put(b"k", b"original"))
            .expect("Failed to put initial data");

        let result: CoreResult<()> = engine.update(|tx| {
            let store = tx.store(TEST_STORE)?;
            store.put(b"k", b"modified")?;
            store.put(b"other", b"x")?;
            Err(CoreError::Cancelled)
        });
        assert!(result.is_err());

        let value = engine
            .view(|tx| tx.store(TEST_STORE)?.get(b"k"))
            .expect("Failed to get");
        assert_eq!(value.as_ref(), b"original");
        let len = engine
            .view(|tx| tx.store(TEST_STORE)?.len())
            .expect("Failed to count");
        assert_eq!(len, 1);
    }

    /// Checks that a transaction reads its own uncommitted writes.
    pub fn test_read_own_writes(engine: &Engine) {
        let mut tx = engine.begin(true).expect("Failed to begin");
        {
            let store = tx.store(TEST_STORE).expect("Failed to open store");
            store.put(b"mine", b"1").expect("Failed to put");
            assert_eq!(store.get(b"mine").expect("Failed to get").as_ref(), b"1");
            store.delete(b"mine").expect("Failed to delete");
            assert!(matches!(store.get(b"mine"), Err(CoreError::KeyNotFound)));
        }
        tx.commit().expect("Failed to commit");
    }
}

/// Iteration integration checks.
pub mod iteration {
    use super::*;

    /// Checks ordering and seek semantics over a populated store.
    pub fn test_iteration_order(engine: &Engine) {
        let keys: [&[u8]; 5] = [b"\x00", b"a", b"ab", b"b", b"\xff"];
        engine
            .update(|tx| {
                let store = tx.store(TEST_STORE)?;
                for key in keys.iter().rev() {
                    store.put(key, b"v")?;
                }
                Ok(())
            })
            .expect("Failed to populate");

        engine
            .view(|tx| {
                let store = tx.store(TEST_STORE)?;

                let mut it = store.iter(Direction::Forward);
                it.seek(b"aa");
                assert_eq!(it.item().map(|i| i.key().to_vec()), Some(b"ab".to_vec()));

                let mut it = store.iter(Direction::Reverse);
                it.seek(b"aa");
                assert_eq!(it.item().map(|i| i.key().to_vec()), Some(b"a".to_vec()));

                let forward: Vec<_> = scan(tx, TEST_STORE, Direction::Forward)
                    .into_iter()
                    .map(|(k, _)| k)
                    .collect();
                let expected: Vec<_> = keys.iter().map(|k| k.to_vec()).collect();
                assert_eq!(forward, expected);
                Ok(())
            })
            .expect("Failed to iterate");
    }
}
