//! Error types for exokv
//!
//! Provides a unified error type for all store operations.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for exokv operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Keyspace Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    NotFound,

    #[error("Key already exists")]
    AlreadyExists,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error is a missing-key condition rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}
