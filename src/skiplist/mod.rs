//! Ranked skip list engine (heap storage mode)
//!
//! A skip list over totally ordered keys where every forward reference
//! carries a *span*: the number of level-0 hops it shortcuts. Summing spans
//! along any search path yields the target's 1-based rank in ascending key
//! order, so lookups return position for free.
//!
//! ```text
//! level 2: [head] --------------------4--------------------> [f]
//! level 1: [head] ---------2--------> [c] --------2--------> [f]
//! level 0: [head] -1-> [a] -1-> [c] -1-> [d] -1-> [f] -1-> [g]
//!                rank:  1        2        3        4        5
//! ```
//!
//! Node heights are drawn geometrically (P(h = k) = 2^-k, capped at the
//! store's level capacity), which keeps expected search cost O(log n)
//! without rebalancing. Nodes live in a slab owned by the list and refer to
//! each other by slot index, never by pointer.

mod level;
mod list;

pub use level::LevelGenerator;
pub use list::{Iter, IterRev, SkipList};

/// Default maximum node height. 2^32 expected elements is far past the
/// point where other limits bite.
pub const DEFAULT_LEVEL_CAPACITY: usize = 32;

/// Hard ceiling on configurable level capacity; search path scratch arrays
/// are sized to this.
pub const MAX_LEVEL_CAPACITY: usize = 64;
