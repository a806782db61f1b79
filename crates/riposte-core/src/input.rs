//! Per-frame button state
//!
//! One `InputBits` value is one player's held buttons during one frame.
//! Once recorded for a frame it never changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Fixed-width button bitmask, one bit per logical button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputBits(u16);

impl InputBits {
    /// No buttons held
    pub const NEUTRAL: InputBits = InputBits(0);

    pub const UP: InputBits = InputBits(1 << 0);
    pub const DOWN: InputBits = InputBits(1 << 1);
    pub const LEFT: InputBits = InputBits(1 << 2);
    pub const RIGHT: InputBits = InputBits(1 << 3);
    pub const PUNCH_WEAK: InputBits = InputBits(1 << 4);
    pub const PUNCH_MED: InputBits = InputBits(1 << 5);
    pub const PUNCH_HEAVY: InputBits = InputBits(1 << 6);
    pub const KICK_WEAK: InputBits = InputBits(1 << 7);
    pub const KICK_MED: InputBits = InputBits(1 << 8);
    pub const KICK_HEAVY: InputBits = InputBits(1 << 9);
    pub const BLOCK: InputBits = InputBits(1 << 10);

    /// Every defined button
    const ALL: u16 = (1 << 11) - 1;

    /// Build from raw bits, dropping any bit that is not a defined button
    pub const fn from_bits_truncate(bits: u16) -> Self {
        InputBits(bits & Self::ALL)
    }

    /// Raw bit value (as sent on the wire)
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Check whether every button in `other` is held
    pub const fn contains(self, other: InputBits) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no button is held
    pub const fn is_neutral(self) -> bool {
        self.0 == 0
    }

    /// Return a copy with `other` held as well
    pub const fn with(self, other: InputBits) -> Self {
        InputBits(self.0 | other.0)
    }

    /// Hold the buttons in `other`
    pub fn insert(&mut self, other: InputBits) {
        self.0 |= other.0;
    }

    /// Release the buttons in `other`
    pub fn remove(&mut self, other: InputBits) {
        self.0 &= !other.0;
    }
}

impl BitOr for InputBits {
    type Output = InputBits;

    fn bitor(self, rhs: InputBits) -> InputBits {
        InputBits(self.0 | rhs.0)
    }
}

impl BitAnd for InputBits {
    type Output = InputBits;

    fn bitand(self, rhs: InputBits) -> InputBits {
        InputBits(self.0 & rhs.0)
    }
}

impl From<InputBits> for u16 {
    fn from(input: InputBits) -> u16 {
        input.0
    }
}

impl fmt::Display for InputBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_default() {
        assert_eq!(InputBits::default(), InputBits::NEUTRAL);
        assert!(InputBits::NEUTRAL.is_neutral());
    }

    #[test]
    fn test_insert_remove() {
        let mut input = InputBits::NEUTRAL;
        input.insert(InputBits::LEFT | InputBits::PUNCH_HEAVY);
        assert!(input.contains(InputBits::LEFT));
        assert!(input.contains(InputBits::PUNCH_HEAVY));
        assert!(!input.contains(InputBits::BLOCK));

        input.remove(InputBits::LEFT);
        assert!(!input.contains(InputBits::LEFT));
        assert_eq!(input, InputBits::PUNCH_HEAVY);
    }

    #[test]
    fn test_truncate_unknown_bits() {
        let input = InputBits::from_bits_truncate(0xffff);
        assert_eq!(input.bits(), 0x07ff);
        assert!(input.contains(InputBits::BLOCK));
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let input = InputBits::UP.with(InputBits::KICK_WEAK);
        let bytes = bincode::serialize(&input).unwrap();
        let raw: u16 = bincode::deserialize(&bytes).unwrap();
        assert_eq!(raw, input.bits());
    }
}
