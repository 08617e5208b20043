//! Shared-memory arena store
//!
//! The same ranked skip list as [`crate::skiplist`], laid out inside one
//! relocatable byte region backed by a file mapping. Every reference is a
//! slot index, never an address, so any process can map the file anywhere
//! and read the same structure. Region layout (all integers u64
//! little-endian):
//!
//! ```text
//! offset 0    header (56 bytes):
//!             magic "RUNGKV01" | len | capacity | tail slot |
//!             level_capacity | level | alloc_boundary
//! header end  node table: capacity + 1 fixed-size slots, slot 0 = sentinel
//!             slot: key bytes | value bytes | backward u64 |
//!                   level_capacity x { forward u64, span u64 }
//! table end   slot_order:    capacity + 1 u64 (allocation permutation)
//!             slot_position: capacity + 1 u64 (its inverse)
//! ```
//!
//! Slot index 0 encodes "none" in forward/backward/tail fields; the
//! sentinel is never a forward target. The free-slot allocator is the
//! permutation pair: positions below `alloc_boundary` in `slot_order` hold
//! in-use slots (the sentinel included), so allocation takes
//! `slot_order[alloc_boundary]` and frees swap the released slot back to
//! the boundary. Node data never moves and the table is never compacted.
//!
//! Multiple processes may attach to one region through the same path;
//! mutation needs external mutual exclusion, and growth additionally
//! invalidates every other attacher's mapping (they must re-attach).

mod layout;
mod region;
mod store;

pub use store::{ArenaOptions, ArenaStore};

use crate::error::Result;

/// Default slot capacity for a freshly formatted region.
pub const DEFAULT_INITIAL_CAPACITY: u64 = 1024;

/// Fixed-width byte encoding for arena keys and values.
///
/// A slot reserves exactly `SIZE` bytes per key/value, so the codec must be
/// total over that width. `read_from` may reject garbage from a corrupt or
/// foreign region; `write_to` receives a buffer of exactly `SIZE` bytes.
pub trait FixedBytes: Sized {
    const SIZE: usize;

    fn write_to(&self, buf: &mut [u8]);

    fn read_from(buf: &[u8]) -> Result<Self>;
}

impl FixedBytes for u64 {
    const SIZE: usize = 8;

    fn write_to(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.to_le_bytes());
    }

    fn read_from(buf: &[u8]) -> Result<Self> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[..8]);
        Ok(u64::from_le_bytes(raw))
    }
}

impl FixedBytes for i64 {
    const SIZE: usize = 8;

    fn write_to(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.to_le_bytes());
    }

    fn read_from(buf: &[u8]) -> Result<Self> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[..8]);
        Ok(i64::from_le_bytes(raw))
    }
}

impl<const N: usize> FixedBytes for [u8; N] {
    const SIZE: usize = N;

    fn write_to(&self, buf: &mut [u8]) {
        buf[..N].copy_from_slice(self);
    }

    fn read_from(buf: &[u8]) -> Result<Self> {
        let mut raw = [0u8; N];
        raw.copy_from_slice(&buf[..N]);
        Ok(raw)
    }
}
