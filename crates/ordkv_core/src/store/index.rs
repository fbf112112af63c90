//! Ordered container backing a store.

use crate::types::{Direction, Item};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// A container shared between a store slot, its iterators and the undo
/// entries that reference it.
pub(crate) type SharedIndex = Arc<RwLock<OrderedIndex>>;

/// Value and soft-delete marker stored under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) value: Bytes,
    pub(crate) tombstone: bool,
}

/// Byte-ordered map of entries.
///
/// The map serves both as the sorted key index and as the key lookup, so the
/// two can never disagree. Tombstoned entries stay in the map until a commit
/// purges them; `tombstones` counts them to keep [`OrderedIndex::live_len`]
/// constant-time.
#[derive(Debug, Default)]
pub(crate) struct OrderedIndex {
    entries: BTreeMap<Bytes, Entry>,
    tombstones: usize,
}

impl OrderedIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shared() -> SharedIndex {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Returns the entry under `key`, tombstoned or not.
    pub(crate) fn entry(&self, key: &[u8]) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Returns the value under `key` unless it is absent or tombstoned.
    pub(crate) fn get_live(&self, key: &[u8]) -> Option<&Bytes> {
        self.entries
            .get(key)
            .filter(|entry| !entry.tombstone)
            .map(|entry| &entry.value)
    }

    /// Returns the live item under `key`.
    pub(crate) fn live_item(&self, key: &Bytes) -> Option<Item> {
        self.get_live(key)
            .map(|value| Item::new(key.clone(), value.clone()))
    }

    /// Writes `entry` under `key`, returning the entry it replaced.
    pub(crate) fn set(&mut self, key: Bytes, entry: Entry) -> Option<Entry> {
        let tombstone = entry.tombstone;
        let previous = self.entries.insert(key, entry);
        if previous.as_ref().is_some_and(|p| p.tombstone) {
            self.tombstones -= 1;
        }
        if tombstone {
            self.tombstones += 1;
        }
        previous
    }

    /// Sets the tombstone flag of an existing entry. Returns false if the key
    /// is absent.
    pub(crate) fn set_tombstone(&mut self, key: &[u8], tombstone: bool) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if entry.tombstone != tombstone {
            entry.tombstone = tombstone;
            if tombstone {
                self.tombstones += 1;
            } else {
                self.tombstones -= 1;
            }
        }
        true
    }

    /// Physically removes `key`.
    pub(crate) fn remove(&mut self, key: &[u8]) -> Option<Entry> {
        let removed = self.entries.remove(key);
        if removed.as_ref().is_some_and(|e| e.tombstone) {
            self.tombstones -= 1;
        }
        removed
    }

    /// Physically removes `key` only if it is still tombstoned.
    pub(crate) fn purge(&mut self, key: &[u8]) -> bool {
        if self.entry(key).is_some_and(|e| e.tombstone) {
            self.remove(key);
            true
        } else {
            false
        }
    }

    /// Number of keys physically present, tombstones included.
    pub(crate) fn physical_len(&self) -> usize {
        self.entries.len()
    }

    /// Number of live keys.
    pub(crate) fn live_len(&self) -> usize {
        self.entries.len() - self.tombstones
    }

    /// Finds the first live item at or past `bound` in `direction`.
    ///
    /// For [`Direction::Forward`] `bound` is a lower bound and the scan is
    /// ascending; for [`Direction::Reverse`] it is an upper bound and the scan
    /// is descending. Positioning is a tree descent; only the run of
    /// tombstones right after the position is walked linearly.
    pub(crate) fn live_from(&self, direction: Direction, bound: Bound<&[u8]>) -> Option<Item> {
        let live = |(key, entry): (&Bytes, &Entry)| {
            (!entry.tombstone).then(|| Item::new(key.clone(), entry.value.clone()))
        };
        match direction {
            Direction::Forward => self
                .entries
                .range::<[u8], _>((bound, Bound::Unbounded))
                .find_map(live),
            Direction::Reverse => self
                .entries
                .range::<[u8], _>((Bound::Unbounded, bound))
                .rev()
                .find_map(live),
        }
    }
}
