//! Snapshot Module
//!
//! Point-in-time binary image of both keyspaces.
//!
//! ## Responsibilities
//! - Encode the full store state deterministically
//! - Write it atomically (temp file + rename)
//! - Decode and validate an image before it replaces live state
//!
//! ## File Format
//! ```text
//! ┌──────────────┬─────────────────────────────────────────────────┐
//! │ count (u64)  │ scalar entries, ascending key                   │
//! │              │   key (u64 len + utf8)                          │
//! │              │   value (u64 len + bytes)                       │
//! │              │   expires_at (i64 ns since epoch, 0 = never)    │
//! ├──────────────┼─────────────────────────────────────────────────┤
//! │ count (u64)  │ sorted-set entries, ascending key               │
//! │              │   key (u64 len + utf8)                          │
//! │              │   bucket count (u64)                            │
//! │              │     score (i64), member count (u64),            │
//! │              │     members (u64 len + utf8), ascending         │
//! └──────────────┴─────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian and fixed width. There is no header,
//! version tag or checksum in the file. The CRC32 of the image is logged.
//!
//! ## Locking
//! Save and load hold both table locks exclusively, scalar first, for the
//! whole operation. Load decodes into staging maps and swaps them in only
//! after the whole image validated, so a bad file leaves the store untouched.

mod codec;
mod file;
mod image;

pub use codec::{decode, encode};
pub use file::{read_file, write_atomic};
pub use image::{BucketRecord, ScalarRecord, SnapshotImage, SortedSetRecord};

use std::path::Path;

use crate::error::Result;
use crate::scalar::ScalarStore;
use crate::sorted_set::SortedSetStore;

/// Summary of one save or load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Scalar keys written or restored
    pub scalars: usize,

    /// Sorted-set keys written or restored
    pub sorted_sets: usize,

    /// Encoded image size
    pub bytes: usize,

    /// CRC32 of the encoded image (logged only, never stored)
    pub crc32: u32,
}

/// Write both keyspaces to `path`
pub fn save(scalars: &ScalarStore, sorted_sets: &SortedSetStore, path: &Path) -> Result<SnapshotStats> {
    // Step 1: Freeze both keyspaces (fixed order: scalar, then sorted-set)
    let scalar_table = scalars.table().lock_exclusive();
    let sorted_table = sorted_sets.table().lock_exclusive();

    // Step 2: Capture and encode
    let image = SnapshotImage::capture(&scalar_table, &sorted_table);
    let data = encode(&image)?;

    // Step 3: Atomic write while the state is still frozen
    write_atomic(path, &data)?;

    let stats = SnapshotStats {
        scalars: image.scalars.len(),
        sorted_sets: image.sorted_sets.len(),
        bytes: data.len(),
        crc32: crc32fast::hash(&data),
    };

    tracing::info!(
        "Saved snapshot {:?} ({} scalar keys, {} sorted-set keys, {} bytes, CRC32={:#010x})",
        path,
        stats.scalars,
        stats.sorted_sets,
        stats.bytes,
        stats.crc32
    );
    Ok(stats)
}

/// Replace both keyspaces with the contents of `path`
///
/// Any failure (missing file, truncation, invalid content) leaves both
/// keyspaces exactly as they were.
pub fn load(scalars: &ScalarStore, sorted_sets: &SortedSetStore, path: &Path) -> Result<SnapshotStats> {
    let mut scalar_table = scalars.table().lock_exclusive();
    let mut sorted_table = sorted_sets.table().lock_exclusive();

    let data = read_file(path)?;
    let crc32 = crc32fast::hash(&data);

    let image = decode(&data).map_err(|e| {
        tracing::warn!("Rejected snapshot {:?} (CRC32={:#010x}): {}", path, crc32, e);
        e
    })?;
    let (staged_scalars, staged_sorted) = image.into_tables()?;

    let stats = SnapshotStats {
        scalars: staged_scalars.len(),
        sorted_sets: staged_sorted.len(),
        bytes: data.len(),
        crc32,
    };

    // Swap, never merge
    *scalar_table = staged_scalars;
    *sorted_table = staged_sorted;

    tracing::info!(
        "Loaded snapshot {:?} ({} scalar keys, {} sorted-set keys, {} bytes, CRC32={:#010x})",
        path,
        stats.scalars,
        stats.sorted_sets,
        stats.bytes,
        stats.crc32
    );
    Ok(stats)
}
