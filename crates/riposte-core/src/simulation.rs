//! The simulation the netcode keeps in lockstep
//!
//! The combat/physics code is a black box to riposte. All the netcode needs
//! is to capture its state, put it back, and step it one frame at a time.

use crate::{Checksum, InputBits};

/// A deterministic, frame-stepped simulation.
///
/// Implementations must be fully deterministic: given the same snapshot and
/// the same sequence of inputs, `step` must produce the same state on every
/// machine. Rendering, audio and other side effects do not belong in `step`
/// since it is re-run during rollback.
pub trait Simulation {
    /// Opaque capture of the full simulation state.
    type Snapshot: Clone;

    /// Capture the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Replace the current state with a previously captured one.
    fn restore(&mut self, snapshot: &Self::Snapshot);

    /// Advance exactly one frame.
    ///
    /// `inputs` is ordered by [`crate::PlayerSlot::index`].
    fn step(&mut self, inputs: &[InputBits; 2]);

    /// Digest of the current state, for desync detection only.
    fn checksum(&self) -> Checksum;

    /// A scalar summary of the physics state.
    ///
    /// Sampled by the anomaly monitor to spot wild drift. Simulations that
    /// have nothing meaningful to report can leave the default.
    fn signature(&self) -> f64 {
        0.0
    }
}
