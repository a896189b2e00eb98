//! Scalar Module
//!
//! Keyspace of byte-string values with optional expiration and bit-level
//! addressing.
//!
//! ## Responsibilities
//! - GET / SET / SETNX / SETXX / DELETE on byte-string values
//! - GETBIT / SETBIT with most-significant-bit-first numbering
//! - Record absolute expiration instants for the sweeper
//!
//! ## Bit Numbering
//! ```text
//!  offset:   0 1 2 3 4 5 6 7 | 8 9 ...
//!  byte 0:  [7 6 5 4 3 2 1 0]| byte 1 ...   (bit position inside the byte)
//! ```
//! Offset 0 is the high bit of the first byte, matching Redis SETBIT.

mod entry;
mod store;

pub use entry::{expiry_from_ttl, ScalarEntry};
pub use store::ScalarStore;
