//! Snapshot encoding
//!
//! bincode with fixed-width little-endian integers and u64 length prefixes.
//! Decoding rejects trailing bytes.

use bincode::Options;

use crate::error::{Result, StoreError};

use super::SnapshotImage;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Encode an image to bytes
pub fn encode(image: &SnapshotImage) -> Result<Vec<u8>> {
    options()
        .serialize(image)
        .map_err(|e| StoreError::Codec(format!("encode failed: {}", e)))
}

/// Decode bytes into an image
///
/// Only the framing is checked here; `SnapshotImage::into_tables` checks
/// the content.
pub fn decode(data: &[u8]) -> Result<SnapshotImage> {
    options()
        .deserialize(data)
        .map_err(|e| StoreError::Codec(format!("decode failed: {}", e)))
}
