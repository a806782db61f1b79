//! Determinism validation via per-frame checksums
//!
//! Each peer records the checksum of every fully confirmed frame and sends
//! it to the other side. A disagreement means the two simulations have
//! diverged. Detection is all this does: it never rewrites history or tries
//! to repair the state. Recovery is a full resynchronization, which is the
//! surrounding application's call.
//!
//! The local and remote observations of a frame are kept separately and
//! compared whichever arrives second, so neither peer's value is
//! privileged just because it showed up first.

use riposte_core::{Checksum, Frame};
use riposte_rollback_buffer::FrameRing;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
struct Observation {
    local: Option<Checksum>,
    remote: Option<Checksum>,
}

/// Snapshot of the validator's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismStatus {
    /// No mismatch at or after the last validated frame
    pub ok: bool,
    pub last_validated_frame: Option<Frame>,
    pub last_mismatch_frame: Option<Frame>,
}

/// Records and compares per-frame checksums
#[derive(Debug)]
pub struct DeterminismValidator {
    history: FrameRing<Observation>,
    newest: Option<Frame>,
    last_validated: Option<Frame>,
    last_mismatch: Option<Frame>,
    mismatches: u64,
}

impl DeterminismValidator {
    /// Create a validator remembering the last `capacity` frames
    pub fn new(capacity: usize) -> Self {
        Self {
            history: FrameRing::new(capacity),
            newest: None,
            last_validated: None,
            last_mismatch: None,
            mismatches: 0,
        }
    }

    /// Store the local checksum for `frame` unless one is already stored
    ///
    /// If the peer's checksum for the frame arrived earlier, the two are
    /// compared now.
    pub fn record(&mut self, frame: Frame, checksum: Checksum) {
        let Some(mut obs) = self.observation(frame) else {
            return;
        };
        if obs.local.is_some() {
            return;
        }
        obs.local = Some(checksum);
        self.history.insert(frame, obs);

        if let Some(remote) = obs.remote {
            self.compare(frame, checksum, remote);
        }
    }

    /// Check a checksum for `frame` against what is already known
    ///
    /// With nothing stored yet, the value is kept as the first observation
    /// and the call returns `true`. Otherwise it returns whether the value
    /// matches. A mismatch is remembered in [`DeterminismValidator::status`].
    pub fn validate(&mut self, frame: Frame, checksum: Checksum) -> bool {
        let Some(mut obs) = self.observation(frame) else {
            return true;
        };
        let baseline = obs.local.or(obs.remote);
        if obs.remote.is_none() {
            obs.remote = Some(checksum);
            self.history.insert(frame, obs);
        }
        match baseline {
            Some(expected) => self.compare(frame, expected, checksum),
            None => {
                self.mark_validated(frame);
                true
            }
        }
    }

    /// Current verdict
    pub fn status(&self) -> DeterminismStatus {
        let ok = match (self.last_mismatch, self.last_validated) {
            (None, _) => true,
            (Some(mismatch), Some(validated)) => mismatch < validated,
            (Some(_), None) => false,
        };
        DeterminismStatus {
            ok,
            last_validated_frame: self.last_validated,
            last_mismatch_frame: self.last_mismatch,
        }
    }

    /// Total mismatches seen since the last reset
    pub fn mismatch_count(&self) -> u64 {
        self.mismatches
    }

    /// Forget everything (rematch or new session)
    pub fn reset(&mut self) {
        self.history.clear();
        self.newest = None;
        self.last_validated = None;
        self.last_mismatch = None;
        self.mismatches = 0;
    }

    /// Stored observation for `frame`, or `None` if the frame is too old to track
    fn observation(&mut self, frame: Frame) -> Option<Observation> {
        let capacity = self.history.capacity() as Frame;
        if let Some(newest) = self.newest {
            if frame.saturating_add(capacity) <= newest {
                return None;
            }
        }
        self.newest = Some(self.newest.map_or(frame, |n| n.max(frame)));
        Some(self.history.get(frame).copied().unwrap_or_default())
    }

    fn compare(&mut self, frame: Frame, expected: Checksum, actual: Checksum) -> bool {
        self.mark_validated(frame);
        if expected == actual {
            return true;
        }
        warn!(
            frame,
            expected = %format!("{:#010x}", expected),
            actual = %format!("{:#010x}", actual),
            "Checksum mismatch, simulations have diverged"
        );
        self.last_mismatch = Some(frame);
        self.mismatches += 1;
        false
    }

    fn mark_validated(&mut self, frame: Frame) {
        self.last_validated = Some(self.last_validated.map_or(frame, |v| v.max(frame)));
    }
}

impl Default for DeterminismValidator {
    fn default() -> Self {
        Self::new(128)
    }
}
