//! Transport contract for peer-to-peer input exchange
//!
//! Any channel that can carry frame-tagged inputs between two peers can
//! drive a [`crate::RollbackSession`]: an in-process loopback for tests, a
//! UDP data channel, a relay. Implementations decide their own reliability
//! policy; the contract promises nothing about delivery or ordering.

use riposte_core::{Checksum, Frame, InputBits};
use serde::{Deserialize, Serialize};

/// Called for every remote input that becomes known
pub type RemoteInputHandler = Box<dyn FnMut(Frame, InputBits)>;

/// Called for every remote checksum that becomes known
pub type RemoteChecksumHandler = Box<dyn FnMut(Frame, Checksum)>;

/// Called with the peer's acknowledged input frontier
pub type RemoteAckHandler = Box<dyn FnMut(Frame)>;

/// Peer-to-peer input channel
///
/// Callers must tolerate remote inputs arriving late, out of order,
/// duplicated or not at all. None of these methods report errors: a failed
/// send is indistinguishable from a lost packet, and connection trouble is
/// surfaced through [`Transport::link_stats`] instead.
pub trait Transport {
    /// Begin establishing the connection
    fn connect(&mut self);

    /// Tear the connection down; safe to call repeatedly
    fn disconnect(&mut self);

    /// Fire-and-forget the local input for `frame`
    fn send_local_input(&mut self, frame: Frame, bits: InputBits);

    /// Register the handler for remote inputs, replacing any previous one
    fn on_remote_input(&mut self, handler: RemoteInputHandler);

    /// Pump pending I/O and timers, dispatching handlers
    ///
    /// Everything runs on the caller's thread; handlers are only ever
    /// invoked from inside this call.
    fn poll(&mut self) {}

    /// Fire-and-forget the checksum of a confirmed frame
    fn send_checksum(&mut self, _frame: Frame, _checksum: Checksum) {}

    /// Register the handler for remote checksums
    fn on_remote_checksum(&mut self, _handler: RemoteChecksumHandler) {}

    /// Tell the peer every one of its inputs below `frontier` has arrived
    ///
    /// Transports without acknowledgements leave this a no-op; the session
    /// then falls back to blind re-sending of recent inputs.
    fn send_input_ack(&mut self, _frontier: Frame) {}

    /// Register the handler for the peer's acknowledgements
    fn on_remote_ack(&mut self, _handler: RemoteAckHandler) {}

    /// Current link telemetry
    fn link_stats(&self) -> LinkStats {
        LinkStats::default()
    }
}

/// Connection health as seen by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// Not started
    #[default]
    Idle,
    /// Negotiating the first connection
    Connecting,
    /// Data channel open
    Open,
    /// Link lost; renegotiation in progress
    Reconnecting,
    /// Torn down locally
    Closed,
}

/// Link telemetry reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LinkStats {
    /// Latest round-trip time in milliseconds
    pub rtt_ms: Option<f64>,
    /// Smoothed round-trip variation in milliseconds
    pub jitter_ms: f64,
    /// Payload bytes sent
    pub bytes_sent: u64,
    /// Payload bytes received
    pub bytes_received: u64,
    /// Inputs that arrived at or below the newest frame already seen
    pub out_of_order: u64,
    /// Frames skipped over by a newer arrival
    pub loss_suspect: u64,
    /// Connection health
    pub state: ConnectionState,
    /// Renegotiations started since the first connection
    pub reconnect_attempts: u32,
}
