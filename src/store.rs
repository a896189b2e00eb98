//! Store Module
//!
//! Composition root that owns both keyspaces and the sweeper.
//!
//! ## Responsibilities
//! - Expose the engine call interface (one method per command)
//! - Route SAVE/LOAD to the snapshot codec
//! - Own the sweeper lifecycle and the eviction hook
//! - Ordered shutdown: stop the sweeper, then optionally save

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::config::Config;
use crate::error::Result;
use crate::scalar::ScalarStore;
use crate::snapshot::{self, SnapshotStats};
use crate::sorted_set::{ScoredMembers, SortedSetStore};
use crate::sweeper::{self, EvictionHook, EvictionNotifier, ExpirationSweeper};

/// The in-memory store
///
/// ## Concurrency:
/// - Every method takes `&self`; share the store as `Arc<Store>`
/// - Scalar and sorted-set keyspaces lock independently
/// - `save`/`load` lock the scalar table, then the sorted-set table
pub struct Store {
    /// Store configuration
    config: Config,

    /// String keyspace (shared with the sweeper thread)
    scalars: Arc<ScalarStore>,

    /// Sorted-set keyspace
    sorted_sets: SortedSetStore,

    /// Eviction hook slot (shared with the sweeper thread)
    notifier: EvictionNotifier,

    /// Background expiration sweeper
    sweeper: ExpirationSweeper,
}

impl Store {
    /// Create an empty store
    ///
    /// The sweeper is not started; call `start_sweeper`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            scalars: Arc::new(ScalarStore::new(config.max_bit_offset)),
            sorted_sets: SortedSetStore::new(),
            notifier: EvictionNotifier::new(),
            sweeper: ExpirationSweeper::new(config.sweep_interval),
            config,
        })
    }

    /// Store configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Scalar Operations
    // =========================================================================

    /// Get a copy of the value for `key`
    pub fn get(&self, key: &str) -> Result<Bytes> {
        self.scalars.get(key)
    }

    /// Read one bit of a value, MSB-first
    pub fn get_bit(&self, key: &str, offset: u64) -> Result<u8> {
        self.scalars.get_bit(key, offset)
    }

    /// Set `key` to `value`, creating it if needed
    pub fn set(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        self.scalars.set(key, value, ttl)
    }

    /// Set `key` only if it does not exist
    pub fn set_nx(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        self.scalars.set_nx(key, value, ttl)
    }

    /// Set `key` only if it already exists
    pub fn set_xx(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        self.scalars.set_xx(key, value, ttl)
    }

    /// Set or clear one bit, returning the previous bit
    pub fn set_bit(&self, key: &str, offset: u64, bit: u8, ttl: Option<Duration>) -> Result<u8> {
        self.scalars.set_bit(key, offset, bit, ttl)
    }

    /// Remove a scalar key, returning its value
    pub fn delete(&self, key: &str) -> Option<Bytes> {
        self.scalars.delete(key)
    }

    /// Remaining time to live of a scalar key
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.scalars.ttl(key)
    }

    // =========================================================================
    // Sorted-Set Operations
    // =========================================================================

    /// Add or move sorted-set members, returning how many were new
    pub fn zadd<I>(&self, key: &str, members: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        self.sorted_sets.zadd(key, members)
    }

    /// Number of members in a sorted set
    pub fn zcard(&self, key: &str) -> Result<usize> {
        self.sorted_sets.zcard(key)
    }

    /// Members with `min <= score <= max`
    pub fn zcount(&self, key: &str, min: i64, max: i64) -> Result<usize> {
        self.sorted_sets.zcount(key, min, max)
    }

    /// Members and scores with `start <= score <= stop`, in (score, member) order
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<ScoredMembers> {
        self.sorted_sets.zrange(key, start, stop)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// The scalar keyspace
    pub fn scalars(&self) -> &ScalarStore {
        &self.scalars
    }

    /// The sorted-set keyspace
    pub fn sorted_sets(&self) -> &SortedSetStore {
        &self.sorted_sets
    }

    /// Total keys across both keyspaces
    pub fn len(&self) -> usize {
        self.scalars.len() + self.sorted_sets.len()
    }

    /// Check if both keyspaces are empty
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.sorted_sets.is_empty()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Write both keyspaces to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<SnapshotStats> {
        snapshot::save(&self.scalars, &self.sorted_sets, path.as_ref())
    }

    /// Replace both keyspaces with the snapshot at `path`
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SnapshotStats> {
        snapshot::load(&self.scalars, &self.sorted_sets, path.as_ref())
    }

    /// Save to the configured snapshot path
    pub fn save_snapshot(&self) -> Result<SnapshotStats> {
        self.save(&self.config.snapshot_path)
    }

    /// Load from the configured snapshot path
    pub fn load_snapshot(&self) -> Result<SnapshotStats> {
        self.load(&self.config.snapshot_path)
    }

    // =========================================================================
    // Expiration
    // =========================================================================

    /// Start the background sweeper; `Ok(false)` if it is already running
    pub fn start_sweeper(&self) -> Result<bool> {
        self.sweeper
            .start(Arc::clone(&self.scalars), self.notifier.clone())
    }

    /// Stop the background sweeper and wait for it; `false` if not running
    pub fn stop_sweeper(&self) -> bool {
        self.sweeper.stop()
    }

    /// Whether the background sweeper is running
    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Run one sweep now, returning the number of evicted keys
    pub fn sweep_expired(&self) -> usize {
        sweeper::sweep_once(&self.scalars, &self.notifier, SystemTime::now())
    }

    /// Install, replace or clear the eviction hook
    pub fn set_eviction_hook(&self, hook: Option<EvictionHook>) {
        self.notifier.set(hook);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop the sweeper, then write the configured snapshot if `save`
    ///
    /// Returns the save statistics when a snapshot was written.
    pub fn shutdown(&self, save: bool) -> Result<Option<SnapshotStats>> {
        if self.stop_sweeper() {
            tracing::info!("Sweeper stopped for shutdown");
        }

        if !save {
            tracing::info!("Shutdown without snapshot");
            return Ok(None);
        }
        self.save_snapshot().map(Some)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("scalars", &self.scalars.len())
            .field("sorted_sets", &self.sorted_sets.len())
            .field("sweeper_running", &self.sweeper.is_running())
            .finish()
    }
}
