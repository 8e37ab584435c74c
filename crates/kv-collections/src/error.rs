//! Key-value store error types.

use thiserror::Error;

/// Error type for key-value store operations.
#[derive(Error, Debug)]
pub enum KvError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Executor connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Encryption or decryption failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Collection reopened with a different encryption setting
    #[error("Encryption key mismatch: {0}")]
    KeyMismatch(String),

    /// Malformed encryption key material
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Stored bytes could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using KvError.
pub type KvResult<T> = Result<T, KvError>;
