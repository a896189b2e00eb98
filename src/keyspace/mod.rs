//! Keyspace Module
//!
//! The locking shape shared by the scalar and sorted-set keyspaces.
//!
//! ## Responsibilities
//! - Map keys to lazily created, individually locked entries
//! - Let reads and writes on different keys proceed in parallel
//! - Serialize writes on the same key through the entry lock
//! - Keep first-writer creation race-free (double-checked locking)
//! - Give delete / sweep / snapshot exclusive access to the whole table
//!
//! ## Lock Layout
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ KeyTable                    RwLock (table)   │
//! │ ┌──────────┬───────────────────────────────┐ │
//! │ │ "user:1" │ Arc<RwLock<V>>   (entry lock) │ │
//! │ │ "user:2" │ Arc<RwLock<V>>   (entry lock) │ │
//! │ │   ...    │   ...                         │ │
//! │ └──────────┴───────────────────────────────┘ │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Entry locks are taken inside the table lock's critical section and
//! released before it. The one exception is `KeyTable::handle`, which clones
//! an entry out so a reader can lock it after the table lock is gone.
//! Entries are never replaced in place, so a cloned handle stays valid for as
//! long as the caller holds it.

mod table;

pub use table::{EntryHandle, EntryMap, KeyTable};
