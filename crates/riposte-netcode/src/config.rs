//! Session configuration
//!
//! Tunables for the rollback engine. Input delay and prediction policy are
//! deliberately configuration rather than constants: the right values depend
//! on the game's feel and the players' connection.
//!
//! # Example
//!
//! ```
//! use riposte_netcode::{PredictionPolicy, SessionConfig};
//! use riposte_core::PlayerSlot;
//!
//! let config = SessionConfig::from_ron(
//!     "(local_slot: Two, input_delay: 3, prediction: Neutral)",
//! ).unwrap();
//!
//! assert_eq!(config.local_slot, PlayerSlot::Two);
//! assert_eq!(config.input_delay, 3);
//! assert_eq!(config.prediction, PredictionPolicy::Neutral);
//! // Unspecified fields keep their defaults
//! assert_eq!(config.max_rollback, 8);
//! ```

use crate::{Error, PredictionPolicy, Result};
use riposte_core::{Frame, PlayerSlot};
use serde::{Deserialize, Serialize};

/// Largest input delay accepted; beyond this the game feels unplayable anyway
pub const MAX_INPUT_DELAY: Frame = 30;

/// Configuration for a [`crate::RollbackSession`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Which slot the local player occupies
    pub local_slot: PlayerSlot,

    /// Frames between sampling a local input and applying it
    ///
    /// Sending ahead hides up to this many frames of latency without any
    /// rollback. Frames below the delay use neutral input for both players.
    pub input_delay: Frame,

    /// Deepest rollback the engine will attempt
    ///
    /// Also the snapshot ring capacity. Speculating past this is fatal.
    pub max_rollback: Frame,

    /// How missing remote inputs are guessed
    pub prediction: PredictionPolicy,

    /// Send a checksum every N fully confirmed frames
    pub checksum_interval: Frame,

    /// Most unacknowledged local inputs re-sent alongside each new one
    ///
    /// Every tick re-sends the newest inputs the peer has not acknowledged
    /// yet, up to this many, so a lost datagram is repaired on the next
    /// tick. Covering `max_rollback + input_delay` keeps any input the peer
    /// can still use in flight. `0` means strictly fire-and-forget, and a
    /// single lost input then stalls the peer's confirmed frontier for good.
    pub input_redundancy: Frame,

    /// Frames of checksum history kept by the determinism validator
    pub validator_history: usize,
}

impl SessionConfig {
    /// Parse a RON document and validate it
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: SessionConfig =
            ron::from_str(source).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can run a session
    pub fn validate(&self) -> Result<()> {
        if self.max_rollback == 0 {
            return Err(Error::InvalidConfig(
                "max_rollback must be at least 1".to_string(),
            ));
        }
        if self.input_delay > MAX_INPUT_DELAY {
            return Err(Error::InvalidConfig(format!(
                "input_delay {} exceeds {}",
                self.input_delay, MAX_INPUT_DELAY
            )));
        }
        if self.checksum_interval == 0 {
            return Err(Error::InvalidConfig(
                "checksum_interval must be at least 1".to_string(),
            ));
        }
        if self.validator_history == 0 {
            return Err(Error::InvalidConfig(
                "validator_history must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Capacity of the input rings
    ///
    /// The remote peer can run at most `max_rollback` frames past what it
    /// has confirmed from us, and each side sends `input_delay` ahead, so
    /// inputs arrive within this window around the local frame.
    pub(crate) fn input_window(&self) -> usize {
        2 * (self.max_rollback as usize + self.input_delay as usize) + 8
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_slot: PlayerSlot::One,
            input_delay: 2,
            max_rollback: 8,
            prediction: PredictionPolicy::RepeatLastConfirmed,
            checksum_interval: 1,
            input_redundancy: 16,
            validator_history: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_rollback_rejected() {
        let config = SessionConfig {
            max_rollback: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_default_redundancy_covers_rollback_window() {
        let config = SessionConfig::default();
        assert!(config.input_redundancy >= config.max_rollback + config.input_delay);
    }

    #[test]
    fn test_shallow_rollback_keeps_default_redundancy() {
        let config = SessionConfig::from_ron("(max_rollback: 1, input_delay: 0)").unwrap();
        assert_eq!(config.input_redundancy, 16);
    }

    #[test]
    fn test_from_ron_rejects_invalid_values() {
        let result = SessionConfig::from_ron("(checksum_interval: 0)");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_ron_rejects_malformed() {
        assert!(SessionConfig::from_ron("(input_delay: \"two\")").is_err());
    }
}
