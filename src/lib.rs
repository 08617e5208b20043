//! # RungKV
//!
//! An ordered key-value store built on a ranked skip list, offered in
//! three storage modes:
//! - In-process heap (`SkipList`) — plain ordered map with rank queries
//! - Shared-memory arena (`ArenaStore`) — the same structure inside a
//!   relocatable file-backed region other processes can attach to
//! - Crash-durable (`DurableStore`) — either backing store wrapped with an
//!   operation log and a snapshot/restore protocol
//!
//! A thin TCP request service exposes one arena store over a socket.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TCP Request Service                       │
//! │        (acceptor → bounded queue → single worker)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one store call at a time
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 DurableStore (optional)                     │
//! │          operation log + snapshot / restore                 │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            ▼                              ▼
//!     ┌─────────────┐               ┌─────────────────┐
//!     │  SkipList   │               │   ArenaStore    │
//!     │   (heap)    │               │ (shared region) │
//!     └─────────────┘               └─────────────────┘
//! ```
//!
//! Every lookup reports the key's 1-based rank in ascending order; the
//! skip list's per-link spans make that a free by-product of the search.
//!
//! No store synchronizes internally: callers serialize access, which the
//! request service does by routing everything through one worker thread.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod blob;
pub mod store;

pub mod skiplist;
pub mod arena;
pub mod wal;
pub mod durable;

pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, RungError};
pub use config::{Config, LogFlushStrategy};

pub use blob::Blob;
pub use store::{Found, RankedStore};

pub use skiplist::SkipList;
pub use arena::{ArenaOptions, ArenaStore};
pub use durable::{DurableStore, RestoreSummary};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of rungkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
