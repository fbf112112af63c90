//! Reference model of a single store.
//!
//! [`ModelStore`] is a plain `BTreeMap` with the engine's observable
//! semantics. Property tests run the same [`StoreOp`]s against both and
//! compare the results.

use crate::generators::StoreOp;
use ordkv_core::{CoreError, CoreResult, Direction, Store};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Observable result of one [`StoreOp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded without returning data.
    Done,
    /// A get returned this value.
    Value(Vec<u8>),
    /// A sequence number was drawn.
    Sequence(u64),
    /// The key was absent.
    NotFound,
}

/// In-memory reference implementation of one store.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    sequence: u64,
}

impl ModelStore {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a model holding `pairs`; later duplicates win.
    pub fn seeded(pairs: &[(Vec<u8>, Vec<u8>)]) -> Self {
        Self {
            entries: pairs.iter().cloned().collect(),
            sequence: 0,
        }
    }

    /// Applies `op` and returns what the engine is expected to return.
    pub fn apply(&mut self, op: &StoreOp) -> Outcome {
        match op {
            StoreOp::Put { key, value } => {
                self.entries.insert(key.clone(), value.clone());
                Outcome::Done
            }
            StoreOp::Delete { key } => match self.entries.remove(key) {
                Some(_) => Outcome::Done,
                None => Outcome::NotFound,
            },
            StoreOp::Get { key } => match self.entries.get(key) {
                Some(value) => Outcome::Value(value.clone()),
                None => Outcome::NotFound,
            },
            StoreOp::Truncate => {
                self.entries.clear();
                Outcome::Done
            }
            StoreOp::NextSequence => {
                self.sequence += 1;
                Outcome::Sequence(self.sequence)
            }
        }
    }

    /// Restores the contents of `snapshot`, keeping this model's sequence.
    ///
    /// Mirrors a rollback: data reverts, sequence numbers do not.
    pub fn rollback_to(&mut self, snapshot: &ModelStore) {
        self.entries = snapshot.entries.clone();
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the model holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All pairs in `direction` order.
    pub fn pairs(&self, direction: Direction) -> Vec<(Vec<u8>, Vec<u8>)> {
        let pairs = self.entries.iter().map(|(k, v)| (k.clone(), v.clone()));
        match direction {
            Direction::Forward => pairs.collect(),
            Direction::Reverse => pairs.rev().collect(),
        }
    }

    /// Keys an iterator yields after seeking to `pivot`.
    pub fn seek(&self, direction: Direction, pivot: &[u8]) -> Vec<Vec<u8>> {
        let bound = if pivot.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(pivot)
        };
        match direction {
            Direction::Forward => self
                .entries
                .range::<[u8], _>((bound, Bound::Unbounded))
                .map(|(k, _)| k.clone())
                .collect(),
            Direction::Reverse => self
                .entries
                .range::<[u8], _>((Bound::Unbounded, bound))
                .rev()
                .map(|(k, _)| k.clone())
                .collect(),
        }
    }
}

/// Applies `op` to an engine store, mapping `KeyNotFound` to
/// [`Outcome::NotFound`].
pub fn apply_op(store: &Store<'_>, op: &StoreOp) -> CoreResult<Outcome> {
    let result = match op {
        StoreOp::Put { key, value } => store.put(key, value).map(|()| Outcome::Done),
        StoreOp::Delete { key } => store.delete(key).map(|()| Outcome::Done),
        StoreOp::Get { key } => store.get(key).map(|value| Outcome::Value(value.to_vec())),
        StoreOp::Truncate => store.truncate().map(|()| Outcome::Done),
        StoreOp::NextSequence => store.next_sequence().map(Outcome::Sequence),
    };
    match result {
        Err(CoreError::KeyNotFound) => Ok(Outcome::NotFound),
        other => other,
    }
}
