//! Sorted-set keyspace operations

use crate::error::{Result, StoreError};
use crate::keyspace::KeyTable;

use super::{ScoredMembers, SortedSet};

/// Keyspace of sorted sets
///
/// ## Concurrency:
/// - `zadd`: same lazy-creation discipline as `ScalarStore::set`
/// - `zcard`, `zcount`, `zrange`: the table lock is held only long enough
///   to clone the entry handle; the read itself holds the entry lock shared
pub struct SortedSetStore {
    table: KeyTable<SortedSet>,
}

impl SortedSetStore {
    /// Create an empty keyspace
    pub fn new() -> Self {
        Self {
            table: KeyTable::new(),
        }
    }

    /// Add or move members, returning how many were newly added
    ///
    /// Moving an existing member to a new score counts 0. When the same
    /// member is given twice, the later score wins.
    pub fn zadd<I>(&self, key: &str, members: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let members: Vec<(String, i64)> = members.into_iter().collect();
        if members.is_empty() {
            return Err(StoreError::InvalidArgument(
                "ZADD needs at least one score/member pair".to_string(),
            ));
        }

        let added = self.table.upsert(key, SortedSet::new, |set| {
            members
                .into_iter()
                .map(|(member, score)| set.insert(member, score))
                .filter(|&is_new| is_new)
                .count()
        });
        Ok(added)
    }

    /// Total member count
    pub fn zcard(&self, key: &str) -> Result<usize> {
        let handle = self.table.handle(key).ok_or(StoreError::NotFound)?;
        let set = handle.read();
        Ok(set.len())
    }

    /// Members with `min <= score <= max`
    pub fn zcount(&self, key: &str, min: i64, max: i64) -> Result<usize> {
        let handle = self.table.handle(key).ok_or(StoreError::NotFound)?;
        let set = handle.read();
        Ok(set.count_in(min, max))
    }

    /// Members and scores with `start <= score <= stop`
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<ScoredMembers> {
        let handle = self.table.handle(key).ok_or(StoreError::NotFound)?;
        let set = handle.read();
        Ok(set.range(start, stop))
    }

    /// Whether `key` has a sorted set
    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Number of sorted-set keys
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the keyspace is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All keys in ascending order
    pub fn keys(&self) -> Vec<String> {
        self.table.keys()
    }

    /// The underlying table (snapshot save/load)
    pub(crate) fn table(&self) -> &KeyTable<SortedSet> {
        &self.table
    }
}

impl Default for SortedSetStore {
    fn default() -> Self {
        Self::new()
    }
}
