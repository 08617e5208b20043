//! Error types for rungkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using RungError
pub type Result<T> = std::result::Result<T, RungError>;

/// Unified error type for rungkv operations
#[derive(Debug, Error)]
pub enum RungError {
    // -------------------------------------------------------------------------
    // Store Results (non-fatal, expected caller outcomes)
    // -------------------------------------------------------------------------
    #[error("duplicate key")]
    DuplicateKey,

    #[error("key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Arena Errors
    // -------------------------------------------------------------------------
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    #[error("region growth failed: {0}")]
    RegionGrowth(String),

    #[error("region corrupt: {0}")]
    RegionCorrupt(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log / Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("format error: {0}")]
    Format(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl RungError {
    /// True for the two expected per-key outcomes a caller handles inline
    /// rather than treating as a failure of the store itself.
    pub fn is_key_outcome(&self) -> bool {
        matches!(self, RungError::DuplicateKey | RungError::KeyNotFound)
    }
}
