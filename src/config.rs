//! Configuration for exokv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Main configuration for an exokv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// File used by SAVE/LOAD and by the startup/shutdown snapshot
    pub snapshot_path: PathBuf,

    /// Write a snapshot when the server shuts down
    pub save_on_shutdown: bool,

    // -------------------------------------------------------------------------
    // Keyspace Configuration
    // -------------------------------------------------------------------------
    /// How often the expiration sweeper scans the scalar keyspace
    pub sweep_interval: Duration,

    /// Exclusive upper bound for SETBIT/GETBIT offsets (bounds value growth)
    pub max_bit_offset: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./exokv.snapshot"),
            save_on_shutdown: true,
            sweep_interval: Duration::from_secs(30),
            max_bit_offset: 1 << 32, // 512 MB worth of bits
            listen_addr: "127.0.0.1:15000".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(StoreError::Config(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        if self.max_bit_offset == 0 {
            return Err(StoreError::Config(
                "max_bit_offset must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(StoreError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(StoreError::Config("snapshot_path is empty".to_string()));
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
    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Enable or disable the shutdown snapshot
    pub fn save_on_shutdown(mut self, enabled: bool) -> Self {
        self.config.save_on_shutdown = enabled;
        self
    }

    /// Set the sweeper interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set the bit offset limit
    pub fn max_bit_offset(mut self, limit: u64) -> Self {
        self.config.max_bit_offset = limit;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
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
