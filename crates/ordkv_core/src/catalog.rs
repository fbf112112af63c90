//! Registry of named stores and their sequence counters.

use crate::store::StoreSlot;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Name-to-store map plus per-name sequence counters.
///
/// Counters live apart from the stores: truncating, dropping or recreating a
/// store never resets its sequence.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    stores: RwLock<BTreeMap<String, Arc<StoreSlot>>>,
    sequences: Mutex<HashMap<String, u64>>,
}

impl Catalog {
    pub(crate) fn get(&self, name: &str) -> Option<Arc<StoreSlot>> {
        self.stores.read().get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.stores.read().contains_key(name)
    }

    /// Registers a new empty store. Returns `None` if the name is taken.
    pub(crate) fn create(&self, name: &str) -> Option<Arc<StoreSlot>> {
        let mut stores = self.stores.write();
        if stores.contains_key(name) {
            return None;
        }
        let slot = Arc::new(StoreSlot::new(name));
        stores.insert(name.to_string(), Arc::clone(&slot));
        Some(slot)
    }

    /// Registers an existing slot under its own name. Returns false if the
    /// name is taken.
    pub(crate) fn insert(&self, slot: Arc<StoreSlot>) -> bool {
        let mut stores = self.stores.write();
        if stores.contains_key(slot.name()) {
            return false;
        }
        stores.insert(slot.name().to_string(), slot);
        true
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Arc<StoreSlot>> {
        self.stores.write().remove(name)
    }

    /// Removes `slot` if it is still the one registered under its name.
    pub(crate) fn remove_slot(&self, slot: &Arc<StoreSlot>) -> bool {
        let mut stores = self.stores.write();
        match stores.get(slot.name()) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                stores.remove(slot.name());
                true
            }
            _ => false,
        }
    }

    /// Store names in ascending order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.stores.read().keys().cloned().collect()
    }

    /// Increments and returns the counter for `name`. The first value is 1.
    pub(crate) fn next_sequence(&self, name: &str) -> u64 {
        let mut sequences = self.sequences.lock();
        let counter = sequences.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub(crate) fn clear(&self) {
        self.stores.write().clear();
        self.sequences.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_duplicates() {
        let catalog = Catalog::default();
        assert!(catalog.create("a").is_some());
        assert!(catalog.create("a").is_none());
        assert!(catalog.contains("a"));
    }

    #[test]
    fn names_are_sorted() {
        let catalog = Catalog::default();
        for name in ["c", "a", "b"] {
            catalog.create(name);
        }
        assert_eq!(catalog.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_slot_ignores_replaced_store() {
        let catalog = Catalog::default();
        let old = catalog.create("s").unwrap();
        catalog.remove("s");
        let new = catalog.create("s").unwrap();

        assert!(!catalog.remove_slot(&old));
        assert!(catalog.remove_slot(&new));
        assert!(!catalog.contains("s"));
    }

    #[test]
    fn sequences_are_independent_of_stores() {
        let catalog = Catalog::default();
        catalog.create("s");
        assert_eq!(catalog.next_sequence("s"), 1);
        assert_eq!(catalog.next_sequence("s"), 2);
        assert_eq!(catalog.next_sequence("other"), 1);

        catalog.remove("s");
        catalog.create("s");
        assert_eq!(catalog.next_sequence("s"), 3);
    }
}
