//! Core-facing store abstraction
//!
//! Both backing stores — the heap [`SkipList`](crate::skiplist::SkipList)
//! and the shared-memory [`ArenaStore`](crate::arena::ArenaStore) — expose
//! the same three operations plus an ordered scan. [`RankedStore`] captures
//! that surface so the durability layer can wrap either one.

use std::fmt;

use crate::error::Result;

/// A successful lookup: the stored value and the key's rank.
///
/// Rank is the key's 1-based position in ascending key order; it is exact
/// at the moment of the lookup and shifts as smaller keys come and go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found<V> {
    pub value: V,
    pub rank: u64,
}

/// Ordered key-value store with positional ranks.
///
/// Implementations keep keys pairwise distinct under the `Ord` total order.
/// The `Debug` bound on keys is the diagnostics formatter: replay warnings
/// and trace output print keys with it, nothing else does.
///
/// No implementation synchronizes internally; callers serialize access
/// (see the server's store mutex).
pub trait RankedStore {
    type Key: Ord + fmt::Debug;
    type Value;

    /// Insert a new key. Fails with `DuplicateKey` if the key is present,
    /// leaving the store untouched.
    fn insert(&mut self, key: Self::Key, value: Self::Value) -> Result<()>;

    /// Fetch the value and rank for `key`, or `KeyNotFound`.
    fn lookup(&self, key: &Self::Key) -> Result<Found<Self::Value>>;

    /// Remove `key`, or fail with `KeyNotFound`.
    fn delete(&mut self, key: &Self::Key) -> Result<()>;

    /// Number of live entries.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, keeping the store attached and usable.
    fn clear(&mut self) -> Result<()>;

    /// Visit every entry in ascending key order. The snapshot writer streams
    /// through this; an error from the visitor aborts the scan.
    fn scan(
        &self,
        visit: &mut dyn FnMut(&Self::Key, &Self::Value) -> Result<()>,
    ) -> Result<()>;
}
