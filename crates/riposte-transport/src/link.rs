//! Peer data channel abstraction
//!
//! A [`PeerLink`] is the unordered, unreliable channel that carries wire
//! messages once negotiation succeeds. Each call to
//! [`PeerLink::create_offer`] or [`PeerLink::accept_offer`] discards the
//! previous channel and starts a fresh one for the new generation.

use crate::signaling::{Candidate, SessionDescription};
use crate::Result;

/// Channel state as seen by the link itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Connecting,
    Open,
    Failed,
    Closed,
}

/// Something that happened on the link during [`PeerLink::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Connectivity established; messages can flow
    Opened,
    /// One datagram payload from the peer
    Message(Vec<u8>),
    /// The peer closed the channel
    Closed,
    /// Negotiation timed out or the peer went silent
    Failed(String),
}

/// Negotiated, datagram-style channel to one peer
pub trait PeerLink {
    /// Open a fresh channel as the originating peer
    fn create_offer(&mut self, generation: u32) -> Result<SessionDescription>;

    /// Open a fresh channel in response to `offer`
    fn accept_offer(&mut self, offer: &SessionDescription) -> Result<SessionDescription>;

    /// Complete an offer this link created
    fn accept_answer(&mut self, answer: &SessionDescription) -> Result<()>;

    /// Add a remote connectivity candidate
    fn add_candidate(&mut self, candidate: &Candidate) -> Result<()>;

    /// Take the local candidates gathered since the last call
    fn local_candidates(&mut self) -> Vec<Candidate>;

    /// Send one payload, unordered and without retransmission
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Pump I/O and timers
    fn poll(&mut self, now_ms: f64) -> Vec<LinkEvent>;

    /// Close the channel; safe to call repeatedly
    fn close(&mut self);

    fn state(&self) -> LinkState;
}
