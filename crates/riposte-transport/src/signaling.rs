//! Out-of-band negotiation messages
//!
//! Before a data channel exists the peers exchange a session description
//! (offer, then answer) and connectivity candidates over some side channel:
//! a lobby server, a chat relay, a pipe. Every message carries the
//! negotiation generation so anything left over from an earlier attempt
//! can be told apart after a reconnection.
//!
//! ```text
//! {"sdp": {"type": "offer", "generation": 1, "addr": "10.0.0.2:50123"}}
//! {"ice": {"generation": 1, "addr": "10.0.0.2:50123"}}
//! {"renegotiate": true}
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Which side of the negotiation a description comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Session description for one negotiation generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub generation: u32,
    /// Default address the describing peer listens on
    pub addr: SocketAddr,
}

/// A connectivity candidate gathered by one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub generation: u32,
    pub addr: SocketAddr,
}

/// Message on the signaling side channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMessage {
    Sdp(SessionDescription),
    Ice(Candidate),
    /// Ask the originating peer for a fresh offer
    Renegotiate(bool),
}

impl SignalMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Side channel used to negotiate the data channel
///
/// Ordering between messages must be preserved; delivery is assumed
/// reliable. Both methods are non-blocking.
pub trait SignalingChannel {
    fn send(&mut self, message: SignalMessage) -> Result<()>;

    /// Next received message, or `None` if nothing is waiting
    fn try_recv(&mut self) -> Result<Option<SignalMessage>>;
}

/// In-process signaling carrying JSON text between two ends
pub struct MemorySignaling {
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl MemorySignaling {
    /// Create two connected ends
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (Self { tx: a_tx, rx: a_rx }, Self { tx: b_tx, rx: b_rx })
    }
}

impl SignalingChannel for MemorySignaling {
    fn send(&mut self, message: SignalMessage) -> Result<()> {
        let text = message.to_json()?;
        self.tx.send(text).map_err(|_| Error::SignalingClosed)
    }

    fn try_recv(&mut self) -> Result<Option<SignalMessage>> {
        match self.rx.try_recv() {
            Ok(text) => SignalMessage::from_json(&text).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::SignalingClosed),
        }
    }
}
