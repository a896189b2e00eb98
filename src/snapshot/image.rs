//! Snapshot image records
//!
//! Serde mirror of the keyspaces. Field order here is the on-disk order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::keyspace::EntryMap;
use crate::scalar::ScalarEntry;
use crate::sorted_set::SortedSet;

/// Whole-store image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotImage {
    pub scalars: Vec<ScalarRecord>,
    pub sorted_sets: Vec<SortedSetRecord>,
}

/// One scalar key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub key: String,
    pub value: Bytes,
    /// Nanoseconds since the Unix epoch, 0 for no expiration
    pub expires_at_nanos: i64,
}

/// One sorted-set key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedSetRecord {
    pub key: String,
    pub buckets: Vec<BucketRecord>,
}

/// Members sharing one score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub score: i64,
    pub members: Vec<String>,
}

impl SnapshotImage {
    /// Copy both tables into records, sorted by key
    ///
    /// The caller holds both table locks; entry locks are taken shared one
    /// at a time.
    pub fn capture(scalars: &EntryMap<ScalarEntry>, sorted_sets: &EntryMap<SortedSet>) -> Self {
        let mut scalar_records: Vec<ScalarRecord> = scalars
            .iter()
            .map(|(key, entry)| {
                let entry = entry.read();
                ScalarRecord {
                    key: key.clone(),
                    value: entry.value.clone(),
                    expires_at_nanos: expiry_to_nanos(entry.expires_at),
                }
            })
            .collect();
        scalar_records.sort_by(|a, b| a.key.cmp(&b.key));

        let mut sorted_records: Vec<SortedSetRecord> = sorted_sets
            .iter()
            .map(|(key, entry)| {
                let set = entry.read();
                let buckets = set
                    .buckets()
                    .map(|(score, members)| BucketRecord {
                        score,
                        members: members.iter().cloned().collect(),
                    })
                    .collect();
                SortedSetRecord {
                    key: key.clone(),
                    buckets,
                }
            })
            .collect();
        sorted_records.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            scalars: scalar_records,
            sorted_sets: sorted_records,
        }
    }

    /// Validate the image and build fresh tables from it
    pub fn into_tables(self) -> Result<(EntryMap<ScalarEntry>, EntryMap<SortedSet>)> {
        let mut scalars: EntryMap<ScalarEntry> = HashMap::with_capacity(self.scalars.len());
        for record in self.scalars {
            let expires_at = nanos_to_expiry(record.expires_at_nanos).ok_or_else(|| {
                StoreError::Codec(format!(
                    "negative expiration {} for key {:?}",
                    record.expires_at_nanos, record.key
                ))
            })?;
            let entry = ScalarEntry {
                value: record.value,
                expires_at,
            };
            if scalars
                .insert(record.key.clone(), Arc::new(RwLock::new(entry)))
                .is_some()
            {
                return Err(StoreError::Codec(format!("duplicate scalar key {:?}", record.key)));
            }
        }

        let mut sorted_sets: EntryMap<SortedSet> = HashMap::with_capacity(self.sorted_sets.len());
        for record in self.sorted_sets {
            let mut buckets: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
            for bucket in record.buckets {
                if buckets.contains_key(&bucket.score) {
                    return Err(StoreError::Codec(format!(
                        "score {} repeated in sorted set {:?}",
                        bucket.score, record.key
                    )));
                }
                let members = buckets.entry(bucket.score).or_default();
                for member in bucket.members {
                    if !members.insert(member) {
                        return Err(StoreError::Codec(format!(
                            "member repeated in bucket {} of sorted set {:?}",
                            bucket.score, record.key
                        )));
                    }
                }
            }

            let set = SortedSet::from_buckets(buckets)
                .map_err(|e| StoreError::Codec(format!("sorted set {:?}: {}", record.key, e)))?;
            if sorted_sets
                .insert(record.key.clone(), Arc::new(RwLock::new(set)))
                .is_some()
            {
                return Err(StoreError::Codec(format!(
                    "duplicate sorted-set key {:?}",
                    record.key
                )));
            }
        }

        Ok((scalars, sorted_sets))
    }
}

/// Absolute expiration as epoch nanoseconds (0 = never)
///
/// Instants at or before the epoch are written as 1 so they stay expired.
fn expiry_to_nanos(expires_at: Option<SystemTime>) -> i64 {
    match expires_at {
        None => 0,
        Some(at) => match at.duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_nanos()).unwrap_or(i64::MAX).max(1),
            Err(_) => 1,
        },
    }
}

/// Inverse of `expiry_to_nanos`; `None` for a negative value
fn nanos_to_expiry(nanos: i64) -> Option<Option<SystemTime>> {
    match nanos {
        n if n < 0 => None,
        0 => Some(None),
        n => Some(UNIX_EPOCH.checked_add(Duration::from_nanos(n as u64))),
    }
}
