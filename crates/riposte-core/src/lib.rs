//! Riposte Core - Frame-indexed building blocks for rollback netcode
//!
//! This crate provides the types every other riposte crate agrees on:
//! - `Frame` - the simulation tick counter shared by both peers
//! - `InputBits` - one player's held buttons during one frame
//! - `Simulation` - the black-box game state the netcode keeps in sync
//! - `SnapshotHistory` - storage for per-frame state snapshots
//! - `ChecksumBuilder` - a stable 32-bit digest for desync detection
//! - `Clock` - wall-clock source for timers, swappable in tests
//!
//! ## Determinism
//!
//! Nothing in here touches randomized hashing or platform-dependent layout.
//! Two peers that feed the same `[InputBits; 2]` sequence into the same
//! `Simulation` must arrive at the same checksum every frame.

mod checksum;
pub mod clock;
mod error;
mod frame;
mod history;
mod input;
mod simulation;
mod snapshot;

pub use checksum::ChecksumBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use frame::{Checksum, Frame, PlayerSlot};
pub use history::SnapshotHistory;
pub use input::InputBits;
pub use simulation::Simulation;
pub use snapshot::{decode_snapshot, encode_snapshot};
