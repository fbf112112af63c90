//! Ordered cursors over a store.
//!
//! A [`StoreIterator`] is bound to the container a store held when the
//! iterator was created. It is positioned by key: every step is a fresh tree
//! lookup past the current key, so puts and deletes made by the owning
//! transaction between steps are observed without invalidating the cursor.
//! The item under the cursor is read from the container on every call, so an
//! overwrite of the current key shows through. Deleted entries are never
//! yielded.
//!
//! ```rust
//! use ordkv_core::{Direction, Engine};
//!
//! let engine = Engine::new();
//! engine.create_store("s").unwrap();
//!
//! let tx = engine.begin(true).unwrap();
//! let store = tx.store("s").unwrap();
//! for key in [b"a", b"b", b"c"] {
//!     store.put(key, b"v").unwrap();
//! }
//!
//! let mut it = store.iter(Direction::Reverse);
//! it.seek(b"bb");
//! let mut keys = Vec::new();
//! while let Some(item) = it.item() {
//!     keys.push(item.key().to_vec());
//!     it.next();
//! }
//! assert_eq!(keys, vec![b"b".to_vec(), b"a".to_vec()]);
//! ```

use crate::error::CoreError;
use crate::store::SharedIndex;
use crate::transaction::Transaction;
use crate::types::{Direction, Item};
use bytes::Bytes;
use std::fmt;
use std::ops::Bound;

/// Cursor over the live items of a store in key order.
///
/// Created unpositioned by [`Store::iter`](crate::Store::iter); call
/// [`seek`](Self::seek) before reading. If the transaction's cancellation
/// signal fires, the cursor becomes invalid and [`error`](Self::error)
/// reports why.
///
/// If the key under the cursor is deleted, the cursor stops being valid but
/// [`next`](Self::next) still advances from that key.
pub struct StoreIterator<'t> {
    tx: &'t Transaction<'t>,
    index: Option<SharedIndex>,
    direction: Direction,
    current: Option<Bytes>,
    error: Option<CoreError>,
}

impl<'t> StoreIterator<'t> {
    pub(crate) fn new(tx: &'t Transaction<'t>, index: SharedIndex, direction: Direction) -> Self {
        Self {
            tx,
            index: Some(index),
            direction,
            current: None,
            error: None,
        }
    }

    /// Returns the traversal direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Positions the cursor relative to `pivot`.
    ///
    /// Forward: the first live key `>= pivot`. Reverse: the last live key
    /// `<= pivot`. An empty pivot starts at the first key (forward) or the
    /// last key (reverse).
    pub fn seek(&mut self, pivot: impl AsRef<[u8]>) {
        self.current = None;
        let Some(index) = &self.index else {
            return;
        };
        if let Err(err) = self.tx.check_signal() {
            self.error = Some(err);
            return;
        }
        self.error = None;

        let pivot = pivot.as_ref();
        let bound = if pivot.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(pivot)
        };
        self.current = index
            .read()
            .live_from(self.direction, bound)
            .map(|item| item.into_parts().0);
        self.tx.stats().record_seek();
    }

    /// Positions the cursor at the first item in iteration order.
    pub fn rewind(&mut self) {
        self.seek(b"");
    }

    /// Advances to the next live item in iteration order.
    ///
    /// Does nothing on an invalid cursor.
    pub fn next(&mut self) {
        let Some(index) = &self.index else {
            return;
        };
        let Some(current) = self.current.take() else {
            return;
        };
        if let Err(err) = self.tx.check_signal() {
            self.error = Some(err);
            return;
        }
        self.current = index
            .read()
            .live_from(self.direction, Bound::Excluded(&current[..]))
            .map(|item| item.into_parts().0);
    }

    /// Returns true while the cursor points at a live item.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.item().is_some()
    }

    /// Returns the current pair under the cursor.
    #[must_use]
    pub fn item(&self) -> Option<Item> {
        let index = self.index.as_ref()?;
        let key = self.current.as_ref()?;
        index.read().live_item(key)
    }

    /// Returns the signal error that invalidated the cursor, if any.
    #[must_use]
    pub fn error(&self) -> Option<&CoreError> {
        self.error.as_ref()
    }

    /// Releases the cursor. Idempotent; a closed cursor is never valid.
    pub fn close(&mut self) {
        self.index = None;
        self.current = None;
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.index.is_none()
    }
}

impl fmt::Debug for StoreIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreIterator")
            .field("direction", &self.direction)
            .field("current", &self.current.as_deref())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{CancelToken, CoreError, Direction, Engine, StoreIterator, TxOptions};

    fn seeded() -> Engine {
        let engine = Engine::new();
        engine.create_store("s").unwrap();
        engine
            .update(|tx| {
                let store = tx.store("s")?;
                for key in ["a", "b", "c", "d"] {
                    store.put(key, key.to_uppercase())?;
                }
                Ok(())
            })
            .unwrap();
        engine
    }

    fn drain(it: &mut StoreIterator<'_>) -> Vec<String> {
        let mut keys = Vec::new();
        while let Some(item) = it.item() {
            keys.push(String::from_utf8(item.key().to_vec()).unwrap());
            it.next();
        }
        keys
    }

    #[test]
    fn unpositioned_iterator_is_invalid() {
        let engine = seeded();
        let tx = engine.begin(false).unwrap();
        let store = tx.store("s").unwrap();
        let it = store.iter(Direction::Forward);
        assert!(!it.valid());
        assert!(it.item().is_none());
    }

    #[test]
    fn forward_seek_semantics() {
        let engine = seeded();
        let tx = engine.begin(false).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);

        it.seek(b"");
        assert_eq!(drain(&mut it), ["a", "b", "c", "d"]);

        it.seek(b"bb");
        assert_eq!(drain(&mut it), ["c", "d"]);

        it.seek(b"e");
        assert!(!it.valid());
    }

    #[test]
    fn reverse_seek_semantics() {
        let engine = seeded();
        let tx = engine.begin(false).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Reverse);

        it.rewind();
        assert_eq!(drain(&mut it), ["d", "c", "b", "a"]);

        it.seek(b"c");
        assert_eq!(drain(&mut it), ["c", "b", "a"]);

        it.seek(b"0");
        assert!(!it.valid());
    }

    #[test]
    fn reseek_after_exhaustion() {
        let engine = seeded();
        let tx = engine.begin(false).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);

        it.seek(b"d");
        it.next();
        assert!(!it.valid());
        it.next();
        assert!(!it.valid());

        it.seek(b"a");
        assert_eq!(it.item().map(|i| i.value().to_vec()), Some(b"A".to_vec()));
    }

    #[test]
    fn skips_deleted_and_sees_own_writes() {
        let engine = seeded();
        let tx = engine.begin(true).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);

        it.seek(b"a");
        store.delete(b"b").unwrap();
        store.delete(b"c").unwrap();
        store.put(b"bb", b"new").unwrap();
        it.next();
        assert_eq!(it.item().map(|i| i.key().to_vec()), Some(b"bb".to_vec()));
        it.next();
        assert_eq!(it.item().map(|i| i.key().to_vec()), Some(b"d".to_vec()));
    }

    #[test]
    fn item_reflects_overwrite_under_cursor() {
        let engine = seeded();
        let tx = engine.begin(true).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);

        it.rewind();
        assert_eq!(it.item().unwrap().value(), b"A");
        store.put(b"a", b"NEW").unwrap();
        assert_eq!(it.item().unwrap().value(), b"NEW");
        it.next();
        assert_eq!(it.item().unwrap().key(), b"b");
    }

    #[test]
    fn delete_under_cursor_still_advances() {
        let engine = seeded();
        let tx = engine.begin(true).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Reverse);

        it.seek(b"c");
        store.delete(b"c").unwrap();
        assert!(!it.valid());
        assert!(it.item().is_none());
        it.next();
        assert_eq!(it.item().unwrap().key(), b"b");
    }

    #[test]
    fn iterator_keeps_container_across_truncate() {
        let engine = seeded();
        let tx = engine.begin(true).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);

        store.truncate().unwrap();
        it.rewind();
        assert_eq!(drain(&mut it), ["a", "b", "c", "d"]);

        let mut fresh = store.iter(Direction::Forward);
        fresh.rewind();
        assert!(!fresh.valid());
    }

    #[test]
    fn close_is_idempotent() {
        let engine = seeded();
        let tx = engine.begin(false).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);

        it.rewind();
        assert!(it.valid());
        it.close();
        it.close();
        assert!(it.is_closed());
        assert!(!it.valid());

        it.rewind();
        assert!(!it.valid());
    }

    #[test]
    fn cancellation_invalidates_cursor() {
        let engine = seeded();
        let token = CancelToken::new();
        let tx = engine
            .begin_with(TxOptions::read_only().with_cancel(token.clone()))
            .unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);

        it.rewind();
        assert!(it.valid());
        token.cancel();
        it.next();
        assert!(!it.valid());
        assert!(matches!(it.error(), Some(CoreError::Cancelled)));

        it.seek(b"a");
        assert!(!it.valid());
    }

    #[test]
    fn items_share_store_bytes() {
        let engine = seeded();
        let tx = engine.begin(false).unwrap();
        let store = tx.store("s").unwrap();
        let mut it = store.iter(Direction::Forward);
        it.seek(b"c");

        let item = it.item().unwrap();
        let mut buf = Vec::new();
        assert_eq!(item.value_copy(&mut buf), b"C");
        let (key, value) = item.into_parts();
        assert_eq!(key.as_ref(), b"c");
        assert_eq!(value, store.get(b"c").unwrap());
    }
}
