//! # exokv
//!
//! An in-memory key-value store with:
//! - Binary-safe string values with optional TTL and bit addressing
//! - Sorted sets with inclusive score-range queries
//! - A background sweeper that evicts expired strings
//! - Atomic binary snapshots of the whole store
//! - A line-oriented TCP protocol with RESP2 replies
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (one thread per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  protocol::execute
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                 │
//! └───────┬──────────────────┬──────────────────┬───────────────┘
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//!  ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │ ScalarStore │   │SortedSetStore│   │   Snapshot   │
//!  │  (KeyTable) │   │  (KeyTable)  │   │ (save/load)  │
//!  └──────▲──────┘   └──────────────┘   └──────────────┘
//!         │ remove_expired
//!  ┌──────┴──────┐
//!  │   Sweeper   │──▶ eviction hook
//!  └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod keyspace;
pub mod network;
pub mod protocol;
pub mod scalar;
pub mod snapshot;
pub mod sorted_set;
pub mod store;
pub mod sweeper;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{Result, StoreError};
pub use snapshot::SnapshotStats;
pub use sorted_set::ScoredMembers;
pub use store::Store;
pub use sweeper::{Eviction, EvictionHook};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of exokv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
