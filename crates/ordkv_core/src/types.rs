//! Core type definitions for ordkv.

use bytes::Bytes;
use std::fmt;

/// Unique identifier for a transaction.
///
/// Transaction IDs are monotonically increasing per engine and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Traversal direction of an iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending byte-wise key order.
    #[default]
    Forward,
    /// Descending byte-wise key order.
    Reverse,
}

impl Direction {
    /// Returns true for [`Direction::Reverse`].
    #[must_use]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Direction::Reverse)
    }
}

/// A key-value pair read from a store.
///
/// Both halves share the store's buffers; cloning is cheap and the bytes
/// cannot be mutated through an `Item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: Bytes,
    value: Bytes,
}

impl Item {
    pub(crate) fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Returns the value.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Copies the value into `buf`, growing it if needed, and returns the
    /// written slice.
    pub fn value_copy<'b>(&self, buf: &'b mut Vec<u8>) -> &'b [u8] {
        buf.clear();
        buf.extend_from_slice(&self.value);
        buf.as_slice()
    }

    /// Splits the item into its key and value.
    #[must_use]
    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_ordering() {
        let t1 = TransactionId::new(1);
        let t2 = TransactionId::new(2);
        assert!(t1 < t2);
        assert_eq!(format!("{t2}"), "txn:2");
    }

    #[test]
    fn direction_default_is_forward() {
        assert_eq!(Direction::default(), Direction::Forward);
        assert!(Direction::Reverse.is_reverse());
    }

    #[test]
    fn item_value_copy_reuses_buffer() {
        let item = Item::new(Bytes::from_static(b"k"), Bytes::from_static(b"value"));
        let mut buf = b"previous contents".to_vec();
        assert_eq!(item.value_copy(&mut buf), b"value");
        assert_eq!(buf, b"value");
    }
}
