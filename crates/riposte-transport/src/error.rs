//! Error types for riposte-transport

use thiserror::Error;

/// Transport error type
///
/// None of these reach the rollback engine: the `Transport` contract is
/// infallible, so the transport logs them and reflects lasting trouble in
/// its connection state.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// The other end of the signaling channel is gone
    #[error("Signaling channel closed")]
    SignalingClosed,

    /// Negotiation message belongs to another generation
    #[error("Stale negotiation: expected generation {expected}, got {got}")]
    StaleGeneration { expected: u32, got: u32 },

    /// No data channel to send on
    #[error("Data channel is not open")]
    NotOpen,

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;
