//! Error types for riposte-monitor

use thiserror::Error;

/// Monitor error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, Error>;
