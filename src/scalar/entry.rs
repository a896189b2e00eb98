//! Scalar entry definitions

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};

/// A byte-string value and its optional absolute expiration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalarEntry {
    /// The stored value (binary-safe)
    pub value: Bytes,

    /// When the sweeper may evict this entry; `None` never expires
    pub expires_at: Option<SystemTime>,
}

impl ScalarEntry {
    /// Create an entry whose expiration is `ttl` from now
    pub fn new(value: impl Into<Bytes>, ttl: Option<Duration>) -> Self {
        Self {
            value: value.into(),
            expires_at: expiry_from_ttl(ttl, SystemTime::now()),
        }
    }

    /// Replace the value and restart the expiration clock
    pub fn overwrite(&mut self, value: Bytes, ttl: Option<Duration>) {
        self.value = value;
        self.expires_at = expiry_from_ttl(ttl, SystemTime::now());
    }

    /// Whether the entry's expiration lies strictly before `now`
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        matches!(self.expires_at, Some(at) if at < now)
    }

    /// Time left before expiration, `None` if the entry never expires
    ///
    /// Returns `Some(Duration::ZERO)` once the instant has passed.
    pub fn remaining_ttl(&self, now: SystemTime) -> Option<Duration> {
        self.expires_at
            .map(|at| at.duration_since(now).unwrap_or(Duration::ZERO))
    }

    /// Read the bit at `offset`; bits past the end of the value read as 0
    pub fn bit(&self, offset: u64) -> u8 {
        let (byte_index, mask) = locate_bit(offset);
        match self.value.get(byte_index) {
            Some(byte) if byte & mask != 0 => 1,
            _ => 0,
        }
    }

    /// Set or clear the bit at `offset`, returning its previous value
    ///
    /// The value grows to `offset / 8 + 1` bytes when needed. New bytes are
    /// zero; existing bytes are preserved.
    pub fn set_bit(&mut self, offset: u64, bit: u8) -> u8 {
        let (byte_index, mask) = locate_bit(offset);

        // Reuses the allocation when this entry holds the only reference
        let mut buf = std::mem::take(&mut self.value)
            .try_into_mut()
            .unwrap_or_else(|shared| BytesMut::from(&shared[..]));
        if buf.len() <= byte_index {
            buf.resize(byte_index + 1, 0);
        }

        let previous = u8::from(buf[byte_index] & mask != 0);
        if bit == 0 {
            buf[byte_index] &= !mask;
        } else {
            buf[byte_index] |= mask;
        }

        self.value = buf.freeze();
        previous
    }
}

/// Turn a relative TTL into an absolute expiration instant
///
/// `None` and a zero duration both mean "no expiration". A deadline past
/// `i64::MAX` nanoseconds after the epoch also yields no expiration, so every
/// live expiry fits the snapshot encoding.
pub fn expiry_from_ttl(ttl: Option<Duration>, now: SystemTime) -> Option<SystemTime> {
    ttl.filter(|d| !d.is_zero())
        .and_then(|d| now.checked_add(d))
        .filter(|at| is_encodable(*at))
}

/// Whether `at` lies within `i64::MAX` nanoseconds of the epoch
fn is_encodable(at: SystemTime) -> bool {
    match at.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_nanos() <= i64::MAX as u128,
        Err(_) => true,
    }
}

/// Byte index and MSB-first mask for a bit offset
fn locate_bit(offset: u64) -> (usize, u8) {
    let byte_index = (offset / 8) as usize;
    let mask = 0x80u8 >> (offset % 8);
    (byte_index, mask)
}
