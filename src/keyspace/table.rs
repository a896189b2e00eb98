//! KeyTable implementation
//!
//! HashMap of per-entry RwLocks behind a table-wide RwLock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};

/// Shared, individually locked entry
pub type EntryHandle<V> = Arc<RwLock<V>>;

/// The map guarded by the table lock
pub type EntryMap<V> = HashMap<String, EntryHandle<V>>;

/// Keyspace table: one table lock plus one lock per entry
///
/// ## Concurrency:
/// - Read paths: table shared → entry shared
/// - Writes to existing entries: table shared → entry exclusive
/// - Creation: table shared, escalate to table exclusive, re-check
/// - Removal and whole-table work: table exclusive
pub struct KeyTable<V> {
    entries: RwLock<EntryMap<V>>,
}

impl<V> KeyTable<V> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Run `f` against an existing entry with both locks held shared
    ///
    /// Returns `None` when the key is absent.
    pub fn read<R>(&self, key: &str, f: impl FnOnce(&V) -> R) -> Option<R> {
        let table = self.entries.read();
        let entry = table.get(key)?;
        let guard = entry.read();
        Some(f(&guard))
    }

    /// Clone the handle for `key` under a brief shared table lock
    ///
    /// The caller may lock the returned entry without holding the table lock.
    pub fn handle(&self, key: &str) -> Option<EntryHandle<V>> {
        self.entries.read().get(key).cloned()
    }

    /// Mutate an existing entry (table shared, entry exclusive)
    ///
    /// Never creates. Returns `None` when the key is absent.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let table = self.entries.read();
        let entry = table.get(key)?;
        let mut guard = entry.write();
        Some(f(&mut guard))
    }

    /// Mutate the entry for `key`, creating it with `create` if absent
    ///
    /// Double-checked locking: the fast path holds the table lock shared. When
    /// the key is missing the shared lock is released, the exclusive lock is
    /// taken and the map is checked again, because another writer may have
    /// created the entry in between.
    pub fn upsert<R>(
        &self,
        key: &str,
        create: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> R {
        {
            let table = self.entries.read();
            if let Some(entry) = table.get(key) {
                let mut guard = entry.write();
                return f(&mut guard);
            }
        }

        let mut table = self.entries.write();
        let entry = table
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(create())));
        let mut guard = entry.write();
        f(&mut guard)
    }

    /// Create the entry for `key` only if no entry exists
    ///
    /// Returns `false` without touching the table if the key is present at
    /// the first check or appears before the exclusive lock is acquired.
    pub fn insert_if_absent(&self, key: &str, create: impl FnOnce() -> V) -> bool {
        if self.entries.read().contains_key(key) {
            return false;
        }

        let mut table = self.entries.write();
        if table.contains_key(key) {
            return false;
        }
        table.insert(key.to_string(), Arc::new(RwLock::new(create())));
        true
    }

    /// Remove an entry outright (table exclusive)
    pub fn remove(&self, key: &str) -> Option<EntryHandle<V>> {
        self.entries.write().remove(key)
    }

    /// Remove every entry matching `predicate` under one exclusive lock
    ///
    /// The removed entries are returned so the caller can act on them after
    /// the table lock is released.
    pub fn remove_where(
        &self,
        mut predicate: impl FnMut(&V) -> bool,
    ) -> Vec<(String, EntryHandle<V>)> {
        let mut table = self.entries.write();

        let doomed: Vec<String> = table
            .iter()
            .filter(|(_, entry)| predicate(&*entry.read()))
            .map(|(key, _)| key.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|key| table.remove(&key).map(|entry| (key, entry)))
            .collect()
    }

    /// Take the table lock exclusively for whole-keyspace work (save/load)
    pub fn lock_exclusive(&self) -> RwLockWriteGuard<'_, EntryMap<V>> {
        self.entries.write()
    }

    /// Whether `key` currently has an entry
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All keys in ascending order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl<V> Default for KeyTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
