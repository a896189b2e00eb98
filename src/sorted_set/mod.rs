//! Sorted Set Module
//!
//! Keyspace of score-ordered member sets.
//!
//! ## Responsibilities
//! - ZADD / ZCARD / ZCOUNT / ZRANGE
//! - Keep each member in exactly one score bucket per key
//! - Enumerate members in (score, member) order
//!
//! ## Data Structure
//! ```text
//! SortedSet
//! ├── buckets: BTreeMap<score, BTreeSet<member>>   (ordered, serialized)
//! │     1 → {"a", "c"}
//! │     5 → {"b"}
//! └── scores:  HashMap<member, score>              (index, derived)
//!       "a" → 1, "b" → 5, "c" → 1
//! ```
//! The index answers "where is this member now?" without scanning every
//! bucket. Buckets that become empty are pruned.

mod entry;
mod store;

pub use entry::{ScoredMembers, SortedSet};
pub use store::SortedSetStore;
