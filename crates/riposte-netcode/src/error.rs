//! Error types for riposte-netcode

use riposte_core::Frame;
use thiserror::Error;

/// Netcode error type
///
/// `PredictionGapExceeded`, `SnapshotEvicted` and `Halted` are fatal to the
/// session: the engine can no longer guarantee both peers see the same
/// match, and the caller should end or resynchronize it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Speculated too far past the last confirmed remote input
    #[error("Prediction gap of {gap} frames exceeds rollback depth {max}")]
    PredictionGapExceeded { gap: Frame, max: Frame },

    /// Rollback target no longer held in the snapshot ring
    #[error("Cannot rollback to frame {frame}, oldest available is {oldest:?}")]
    SnapshotEvicted { frame: Frame, oldest: Option<Frame> },

    /// A previous fatal error stopped the session
    #[error("Session halted after fatal desync; reset before advancing")]
    Halted,

    /// Local inputs must be recorded one frame after another
    #[error("Local input for frame {got} out of sequence, expected frame {expected}")]
    NonMonotonicInput { expected: Frame, got: Frame },

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wire message could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error ends the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::PredictionGapExceeded { .. } | Error::SnapshotEvicted { .. } | Error::Halted
        )
    }
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
