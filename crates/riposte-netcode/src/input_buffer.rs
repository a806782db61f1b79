//! Input buffering for frame synchronization
//!
//! Local inputs are authoritative the moment they are sampled. Remote
//! inputs are either confirmed (received from the peer) or predicted
//! (guessed so the simulation can keep running); a confirmation that
//! disagrees with the guess is what triggers a rollback.

use crate::{Error, PredictionPolicy, Result};
use riposte_core::{Frame, InputBits};
use riposte_rollback_buffer::FrameRing;

/// Append-only record of the local player's inputs
#[derive(Debug)]
pub struct LocalInputs {
    inputs: FrameRing<InputBits>,
    /// Frames below this are neutral by definition (input delay lead-in)
    first_frame: Frame,
    next_frame: Frame,
}

impl LocalInputs {
    /// Create a buffer whose first sampled input lands on `first_frame`
    pub fn new(capacity: usize, first_frame: Frame) -> Self {
        Self {
            inputs: FrameRing::new(capacity),
            first_frame,
            next_frame: first_frame,
        }
    }

    /// Record the input for the next frame
    ///
    /// Returns `Err` if `frame` is not exactly the next expected frame.
    pub fn push(&mut self, frame: Frame, bits: InputBits) -> Result<()> {
        if frame != self.next_frame {
            return Err(Error::NonMonotonicInput {
                expected: self.next_frame,
                got: frame,
            });
        }
        self.inputs.insert(frame, bits);
        self.next_frame += 1;
        Ok(())
    }

    /// Get the input recorded for `frame`
    pub fn get(&self, frame: Frame) -> Option<InputBits> {
        if frame < self.first_frame {
            return Some(InputBits::NEUTRAL);
        }
        self.inputs.get(frame).copied()
    }

    /// The frame the next pushed input must be for
    pub fn next_frame(&self) -> Frame {
        self.next_frame
    }

    /// Get the number of buffered inputs
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RemoteSlot {
    bits: InputBits,
    confirmed: bool,
}

/// Outcome of recording a received remote input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Newly confirmed; `previous` is the prediction used for it, if the
    /// frame was already simulated
    Accepted { previous: Option<InputBits> },
    /// Already confirmed; confirmed inputs never change
    Duplicate,
    /// Too far ahead of the confirmed frontier to store
    OutOfWindow,
}

/// Confirmed and predicted inputs of the remote player
#[derive(Debug)]
pub struct RemoteInputs {
    slots: FrameRing<RemoteSlot>,
    last_confirmed: Option<Frame>,
    last_confirmed_bits: Option<InputBits>,
    preconfirmed: Frame,
}

impl RemoteInputs {
    /// Create a buffer where frames below `preconfirmed` are already
    /// confirmed neutral
    pub fn new(capacity: usize, preconfirmed: Frame) -> Self {
        let last_confirmed = preconfirmed.checked_sub(1);
        Self {
            slots: FrameRing::new(capacity),
            last_confirmed,
            last_confirmed_bits: last_confirmed.map(|_| InputBits::NEUTRAL),
            preconfirmed,
        }
    }

    /// Record an input received from the peer
    pub fn confirm(&mut self, frame: Frame, bits: InputBits) -> Confirmation {
        if frame < self.frontier() {
            return Confirmation::Duplicate;
        }
        if (frame - self.frontier()) as usize >= self.slots.capacity() {
            return Confirmation::OutOfWindow;
        }

        let previous = match self.slots.get(frame) {
            Some(slot) if slot.confirmed => return Confirmation::Duplicate,
            Some(slot) => Some(slot.bits),
            None => None,
        };
        self.slots.insert(
            frame,
            RemoteSlot {
                bits,
                confirmed: true,
            },
        );

        while let Some(slot) = self.slots.get(self.frontier()).copied() {
            if !slot.confirmed {
                break;
            }
            let frame = self.frontier();
            self.last_confirmed_bits = Some(slot.bits);
            self.last_confirmed = Some(frame);
        }

        Confirmation::Accepted { previous }
    }

    /// Get the input to simulate `frame` with
    ///
    /// Returns the confirmed input, or records and returns a prediction.
    /// The flag is `true` when the value is a prediction.
    pub fn resolve(&mut self, frame: Frame, policy: PredictionPolicy) -> (InputBits, bool) {
        if frame < self.preconfirmed {
            return (InputBits::NEUTRAL, false);
        }
        match self.slots.get(frame) {
            Some(slot) if slot.confirmed => (slot.bits, false),
            _ => {
                let bits = policy.predict(self.last_confirmed_bits);
                self.slots.insert(
                    frame,
                    RemoteSlot {
                        bits,
                        confirmed: false,
                    },
                );
                (bits, true)
            }
        }
    }

    /// Whether the input for `frame` is confirmed
    pub fn is_confirmed(&self, frame: Frame) -> bool {
        frame < self.frontier() || self.slots.get(frame).is_some_and(|slot| slot.confirmed)
    }

    /// Last frame of the contiguous confirmed prefix
    pub fn last_confirmed(&self) -> Option<Frame> {
        self.last_confirmed
    }

    /// First frame not yet covered by the contiguous confirmed prefix
    pub fn frontier(&self) -> Frame {
        self.last_confirmed.map_or(0, |f| f + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_push_and_lead_in() {
        let mut local = LocalInputs::new(16, 2);
        assert_eq!(local.get(0), Some(InputBits::NEUTRAL));
        assert_eq!(local.get(2), None);

        local.push(2, InputBits::LEFT).unwrap();
        local.push(3, InputBits::RIGHT).unwrap();
        assert_eq!(local.get(2), Some(InputBits::LEFT));
        assert_eq!(local.get(3), Some(InputBits::RIGHT));
        assert_eq!(local.next_frame(), 4);
    }

    #[test]
    fn test_local_rejects_gaps_and_rewrites() {
        let mut local = LocalInputs::new(16, 0);
        local.push(0, InputBits::UP).unwrap();

        assert_eq!(
            local.push(0, InputBits::DOWN),
            Err(Error::NonMonotonicInput {
                expected: 1,
                got: 0
            })
        );
        assert!(local.push(5, InputBits::DOWN).is_err());
        assert_eq!(local.get(0), Some(InputBits::UP));
    }

    #[test]
    fn test_remote_preconfirmed_lead_in() {
        let mut remote = RemoteInputs::new(16, 3);
        assert_eq!(remote.last_confirmed(), Some(2));
        assert!(remote.is_confirmed(0));
        assert_eq!(
            remote.resolve(1, PredictionPolicy::Neutral),
            (InputBits::NEUTRAL, false)
        );
        assert_eq!(remote.confirm(2, InputBits::UP), Confirmation::Duplicate);
    }

    #[test]
    fn test_remote_prediction_then_confirmation() {
        let mut remote = RemoteInputs::new(16, 0);
        assert_eq!(remote.last_confirmed(), None);

        remote.confirm(0, InputBits::BLOCK);
        let (bits, speculative) = remote.resolve(1, PredictionPolicy::RepeatLastConfirmed);
        assert_eq!(bits, InputBits::BLOCK);
        assert!(speculative);

        assert_eq!(
            remote.confirm(1, InputBits::KICK_MED),
            Confirmation::Accepted {
                previous: Some(InputBits::BLOCK)
            }
        );
        assert_eq!(
            remote.resolve(1, PredictionPolicy::RepeatLastConfirmed),
            (InputBits::KICK_MED, false)
        );
    }

    #[test]
    fn test_confirmed_is_immutable() {
        let mut remote = RemoteInputs::new(16, 0);
        remote.confirm(4, InputBits::UP);
        assert_eq!(remote.confirm(4, InputBits::DOWN), Confirmation::Duplicate);
        assert_eq!(
            remote.resolve(4, PredictionPolicy::Neutral),
            (InputBits::UP, false)
        );
    }

    #[test]
    fn test_frontier_waits_for_gaps() {
        let mut remote = RemoteInputs::new(16, 0);
        remote.confirm(0, InputBits::NEUTRAL);
        remote.confirm(2, InputBits::UP);
        assert_eq!(remote.last_confirmed(), Some(0));
        assert!(remote.is_confirmed(2));
        assert!(!remote.is_confirmed(1));

        remote.confirm(1, InputBits::NEUTRAL);
        assert_eq!(remote.last_confirmed(), Some(2));
        assert_eq!(remote.frontier(), 3);
    }

    #[test]
    fn test_out_of_window() {
        let mut remote = RemoteInputs::new(8, 0);
        assert_eq!(remote.confirm(8, InputBits::UP), Confirmation::OutOfWindow);
        assert_eq!(
            remote.confirm(7, InputBits::UP),
            Confirmation::Accepted { previous: None }
        );
    }
}
