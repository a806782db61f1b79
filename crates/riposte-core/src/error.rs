//! Error types for riposte-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Snapshot encoding failed: {0}")]
    SnapshotEncode(String),

    #[error("Snapshot decoding failed: {0}")]
    SnapshotDecode(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
