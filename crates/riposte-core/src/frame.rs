//! Frame counter and per-frame identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete simulation tick, the unit of synchronization.
///
/// Both peers agree on what frame `n` means, not on when it happens.
pub type Frame = u32;

/// 32-bit digest of simulation state at a frame.
///
/// Only ever compared for equality; never used to rebuild state.
pub type Checksum = u32;

/// Which side of the match a player occupies.
///
/// The simulation always receives inputs ordered by slot, so both peers
/// hand it the same array regardless of which one is local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlayerSlot {
    #[default]
    One,
    Two,
}

impl PlayerSlot {
    /// Index into a `[InputBits; 2]` array
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    /// The slot occupied by the other player
    pub fn opponent(self) -> PlayerSlot {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerSlot::One => write!(f, "P1"),
            PlayerSlot::Two => write!(f, "P2"),
        }
    }
}
