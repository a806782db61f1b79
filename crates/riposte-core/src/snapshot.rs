//! Byte encoding for simulation snapshots
//!
//! Simulations that keep their state in plain serde types can use these
//! helpers to store snapshots as compact byte buffers, which also makes
//! them easy to ship to a peer for a full resynchronization.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Encode a serializable state into a snapshot buffer
pub fn encode_snapshot<T: Serialize>(state: &T) -> Result<Vec<u8>> {
    bincode::serialize(state).map_err(|e| Error::SnapshotEncode(e.to_string()))
}

/// Decode a snapshot buffer produced by [`encode_snapshot`]
pub fn decode_snapshot<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| Error::SnapshotDecode(e.to_string()))
}
