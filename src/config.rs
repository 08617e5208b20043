//! Configuration for rungkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::arena::DEFAULT_INITIAL_CAPACITY;
use crate::error::{Result, RungError};
use crate::skiplist::{DEFAULT_LEVEL_CAPACITY, MAX_LEVEL_CAPACITY};

/// Main configuration for a rungkv server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Region Configuration
    // -------------------------------------------------------------------------
    /// Backing file for the shared-memory arena region. Created on first
    /// attach; other processes attach to the same store through this path.
    pub region_path: PathBuf,

    /// Reuse an existing region at `region_path` when its integrity tag is
    /// valid. When false the region is always reformatted.
    pub resume: bool,

    /// Maximum node height the store will ever draw (1..=64).
    pub level_capacity: usize,

    /// Slot capacity of a freshly formatted region. Growth doubles capacity
    /// but is not crash-safe, so size for the expected key count up front.
    pub initial_capacity: u64,

    /// Delete the region file when the store is dropped. When false the
    /// data survives for the next attach.
    pub delete_region_on_close: bool,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Flush strategy: how often durable deployments fsync the operation log
    pub log_flush_strategy: LogFlushStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max accepted connections queued for the worker before accepts block
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Operation log flush strategy
#[derive(Debug, Clone, Copy)]
pub enum LogFlushStrategy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N buffered records (balanced durability/performance)
    EveryN { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region_path: PathBuf::from("./rungkv_region"),
            resume: true,
            level_capacity: DEFAULT_LEVEL_CAPACITY,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            delete_region_on_close: false,
            log_flush_strategy: LogFlushStrategy::EveryN { count: 100 },
            listen_addr: "127.0.0.1:8089".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check field ranges before a store or server is built from this config.
    pub fn validate(&self) -> Result<()> {
        if self.level_capacity == 0 || self.level_capacity > MAX_LEVEL_CAPACITY {
            return Err(RungError::Config(format!(
                "level_capacity must be in 1..={MAX_LEVEL_CAPACITY}, got {}",
                self.level_capacity
            )));
        }
        if self.initial_capacity == 0 {
            return Err(RungError::Config(
                "initial_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(RungError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the arena region file path
    pub fn region_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.region_path = path.into();
        self
    }

    /// Reuse (true) or reformat (false) an existing region file
    pub fn resume(mut self, resume: bool) -> Self {
        self.config.resume = resume;
        self
    }

    /// Set the maximum node height
    pub fn level_capacity(mut self, levels: usize) -> Self {
        self.config.level_capacity = levels;
        self
    }

    /// Set the slot capacity for a freshly formatted region
    pub fn initial_capacity(mut self, slots: u64) -> Self {
        self.config.initial_capacity = slots;
        self
    }

    /// Delete the region file when the store is dropped
    pub fn delete_region_on_close(mut self, delete: bool) -> Self {
        self.config.delete_region_on_close = delete;
        self
    }

    /// Set the operation log flush strategy
    pub fn log_flush_strategy(mut self, strategy: LogFlushStrategy) -> Self {
        self.config.log_flush_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the connection queue bound
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
