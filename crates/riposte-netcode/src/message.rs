//! Wire messages exchanged between peers
//!
//! Every payload on the data channel is one of these variants, encoded as a
//! small JSON object tagged by `t`. Anything that does not decode into a
//! known variant is dropped at the transport boundary and never reaches
//! the engine.
//!
//! ```text
//! { "t": "i", "f": 120, "b": 17 }          input for frame 120
//! { "t": "p", "ts": 5021.5 }               heartbeat, please echo
//! { "t": "p", "ts": 5021.5, "echo": true } heartbeat echo
//! { "t": "renegotiate" }                   restart connection negotiation
//! { "t": "c", "f": 118, "c": 3735928559 }  checksum of confirmed frame 118
//! { "t": "a", "f": 121 }                   every input below 121 received
//! ```

use crate::{Error, Result};
use riposte_core::{Checksum, Frame, InputBits};
use serde::{Deserialize, Serialize};

/// Application-level message on the peer data channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum WireMessage {
    /// One player's input for one frame
    #[serde(rename = "i")]
    Input {
        #[serde(rename = "f")]
        frame: Frame,
        #[serde(rename = "b")]
        bits: InputBits,
    },

    /// Round-trip probe; `echo` marks the reply
    #[serde(rename = "p")]
    Ping {
        #[serde(rename = "ts")]
        timestamp: f64,
        #[serde(default, skip_serializing_if = "is_false")]
        echo: bool,
    },

    /// Ask the peer to restart connection negotiation
    #[serde(rename = "renegotiate")]
    Renegotiate,

    /// Checksum of a fully confirmed frame
    #[serde(rename = "c")]
    Checksum {
        #[serde(rename = "f")]
        frame: Frame,
        #[serde(rename = "c")]
        checksum: Checksum,
    },

    /// The sender holds every one of our inputs below `frame`
    #[serde(rename = "a")]
    Ack {
        #[serde(rename = "f")]
        frame: Frame,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl WireMessage {
    /// Encode for the data channel
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode a payload received from the data channel
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}
