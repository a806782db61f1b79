//! Remote input prediction
//!
//! When the remote input for a frame has not arrived, the engine keeps
//! simulating with a guess. Fighting game inputs are held for many frames
//! at a time, so repeating the last confirmed input is usually right.

use riposte_core::InputBits;
use serde::{Deserialize, Serialize};

/// How a missing remote input is guessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PredictionPolicy {
    /// Assume the remote player is still holding what they last held
    #[default]
    RepeatLastConfirmed,
    /// Assume no buttons are held
    Neutral,
}

impl PredictionPolicy {
    /// Guess the input for an unconfirmed frame
    ///
    /// `last_confirmed` is the newest confirmed remote input before the
    /// frame, or `None` if nothing has been confirmed yet.
    pub fn predict(self, last_confirmed: Option<InputBits>) -> InputBits {
        match self {
            PredictionPolicy::RepeatLastConfirmed => last_confirmed.unwrap_or(InputBits::NEUTRAL),
            PredictionPolicy::Neutral => InputBits::NEUTRAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_last() {
        let policy = PredictionPolicy::RepeatLastConfirmed;
        assert_eq!(policy.predict(None), InputBits::NEUTRAL);
        assert_eq!(policy.predict(Some(InputBits::BLOCK)), InputBits::BLOCK);
    }

    #[test]
    fn test_neutral_ignores_history() {
        let policy = PredictionPolicy::Neutral;
        assert_eq!(policy.predict(Some(InputBits::BLOCK)), InputBits::NEUTRAL);
    }
}
