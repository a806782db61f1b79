//! Deterministic checksums for desync detection
//!
//! FNV-1a over an explicit little-endian byte stream. Unlike
//! `std::collections::hash_map::DefaultHasher`, the output is identical
//! across runs, processes and platforms, which is the whole point: two
//! peers compare these values frame by frame.
//!
//! # Example
//!
//! ```
//! use riposte_core::ChecksumBuilder;
//!
//! let mut a = ChecksumBuilder::new();
//! a.write_i32(120).write_i32(-4);
//!
//! let mut b = ChecksumBuilder::new();
//! b.write_i32(120).write_i32(-4);
//!
//! assert_eq!(a.finish(), b.finish());
//! ```

use crate::Checksum;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Incremental 32-bit FNV-1a digest
#[derive(Debug, Clone, Copy)]
pub struct ChecksumBuilder {
    state: u32,
}

impl ChecksumBuilder {
    /// Start a new digest
    pub fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }

    /// Digest a byte slice in one call
    pub fn of_bytes(bytes: &[u8]) -> Checksum {
        let mut builder = Self::new();
        builder.write_bytes(bytes);
        builder.finish()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.state ^= b as u32;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Floats are digested by bit pattern, so `-0.0` and `0.0` differ.
    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.write_bytes(&value.to_bits().to_le_bytes())
    }

    /// Current digest value
    pub fn finish(&self) -> Checksum {
        self.state
    }
}

impl Default for ChecksumBuilder {
    fn default() -> Self {
        Self::new()
    }
}
