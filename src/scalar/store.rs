//! Scalar keyspace operations

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::keyspace::KeyTable;

use super::ScalarEntry;

/// Keyspace of byte-string values
///
/// ## Concurrency:
/// - `get`, `get_bit`, `ttl`: table shared → entry shared
/// - `set`, `set_bit`: table shared → entry exclusive, escalating the table
///   lock to exclusive only to create a missing key
/// - `set_nx`: creation only, under the exclusive table lock
/// - `set_xx`: table shared → entry exclusive, never creates
/// - `delete`, `remove_expired`: table exclusive
pub struct ScalarStore {
    table: KeyTable<ScalarEntry>,

    /// Exclusive upper bound on bit offsets accepted by `set_bit`
    max_bit_offset: u64,
}

impl ScalarStore {
    /// Create an empty keyspace
    pub fn new(max_bit_offset: u64) -> Self {
        Self {
            table: KeyTable::new(),
            max_bit_offset,
        }
    }

    /// Get a copy of the value for `key`
    ///
    /// Expiration is not checked here; a logically expired value stays
    /// readable until the sweeper evicts it.
    pub fn get(&self, key: &str) -> Result<Bytes> {
        self.table
            .read(key, |entry| entry.value.clone())
            .ok_or(StoreError::NotFound)
    }

    /// Read one bit of the value (0 past the end of the value)
    pub fn get_bit(&self, key: &str, offset: u64) -> Result<u8> {
        self.table
            .read(key, |entry| entry.bit(offset))
            .ok_or(StoreError::NotFound)
    }

    /// Set `key` to `value`, creating the entry if needed
    pub fn set(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        let value = value.into();
        self.table
            .upsert(key, ScalarEntry::default, |entry| entry.overwrite(value, ttl));
        Ok(())
    }

    /// Set `key` only if it does not exist yet
    pub fn set_nx(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        let value = value.into();
        if self.table.insert_if_absent(key, || ScalarEntry::new(value, ttl)) {
            Ok(())
        } else {
            Err(StoreError::AlreadyExists)
        }
    }

    /// Set `key` only if it already exists (value and expiration)
    pub fn set_xx(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        let value = value.into();
        self.table
            .update(key, |entry| entry.overwrite(value, ttl))
            .ok_or(StoreError::NotFound)
    }

    /// Set or clear one bit, returning the previous bit
    ///
    /// Creates the key if absent. The entry's expiration is reset from `ttl`,
    /// as with `set`.
    pub fn set_bit(&self, key: &str, offset: u64, bit: u8, ttl: Option<Duration>) -> Result<u8> {
        if bit > 1 {
            return Err(StoreError::InvalidArgument(format!(
                "bit must be 0 or 1, got {}",
                bit
            )));
        }
        if offset >= self.max_bit_offset {
            return Err(StoreError::InvalidArgument(format!(
                "bit offset {} out of range (limit {})",
                offset, self.max_bit_offset
            )));
        }

        let previous = self.table.upsert(key, ScalarEntry::default, |entry| {
            let previous = entry.set_bit(offset, bit);
            entry.expires_at = super::expiry_from_ttl(ttl, SystemTime::now());
            previous
        });
        Ok(previous)
    }

    /// Remove `key`, returning the value it held
    pub fn delete(&self, key: &str) -> Option<Bytes> {
        self.table
            .remove(key)
            .map(|entry| {
                let value = entry.read().value.clone();
                value
            })
    }

    /// Remaining time to live: `Ok(None)` for a key without expiration
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = SystemTime::now();
        self.table
            .read(key, |entry| entry.remaining_ttl(now))
            .ok_or(StoreError::NotFound)
    }

    /// Remove every entry that expired before `now` in one exclusive pass
    ///
    /// Returns the removed keys and entries so the caller can notify
    /// observers after the table lock is released.
    pub fn remove_expired(&self, now: SystemTime) -> Vec<(String, ScalarEntry)> {
        self.table
            .remove_where(|entry| entry.is_expired_at(now))
            .into_iter()
            .map(|(key, handle)| {
                let entry = Arc::try_unwrap(handle)
                    .map(RwLock::into_inner)
                    .unwrap_or_else(|shared| {
                        let entry = shared.read().clone();
                        entry
                    });
                (key, entry)
            })
            .collect()
    }

    /// Whether `key` has an entry (expired or not)
    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Number of entries, including expired ones not yet swept
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
    pub(crate) fn table(&self) -> &KeyTable<ScalarEntry> {
        &self.table
    }
}

impl Default for ScalarStore {
    fn default() -> Self {
        Self::new(crate::config::Config::default().max_bit_offset)
    }
}
