//! In-process loopback transport
//!
//! Two [`MemoryTransport`]s created by [`MemoryTransport::pair`] deliver to
//! each other through shared queues. Messages go through the real wire
//! codec, and delivery only happens inside `poll`, so tests can hold,
//! reorder or drop traffic between ticks to exercise prediction and
//! rollback deterministically.

use crate::message::WireMessage;
use crate::transport::{
    ConnectionState, LinkStats, RemoteAckHandler, RemoteChecksumHandler, RemoteInputHandler,
    Transport,
};
use riposte_core::{Checksum, Frame, InputBits};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::warn;

type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// One end of an in-process transport pair
pub struct MemoryTransport {
    outbound: Queue,
    inbound: Queue,
    connected: bool,
    hold_inbound: bool,
    input_handler: Option<RemoteInputHandler>,
    checksum_handler: Option<RemoteChecksumHandler>,
    ack_handler: Option<RemoteAckHandler>,
    stats: LinkStats,
}

impl MemoryTransport {
    /// Create two connected ends
    pub fn pair() -> (Self, Self) {
        let a_to_b: Queue = Rc::default();
        let b_to_a: Queue = Rc::default();
        (
            Self::new(a_to_b.clone(), b_to_a.clone()),
            Self::new(b_to_a, a_to_b),
        )
    }

    fn new(outbound: Queue, inbound: Queue) -> Self {
        Self {
            outbound,
            inbound,
            connected: false,
            hold_inbound: false,
            input_handler: None,
            checksum_handler: None,
            ack_handler: None,
            stats: LinkStats::default(),
        }
    }

    /// Stop (or resume) delivering inbound messages on `poll`
    pub fn hold_inbound(&mut self, hold: bool) {
        self.hold_inbound = hold;
    }

    /// Number of messages waiting to be delivered to this end
    pub fn pending_inbound(&self) -> usize {
        self.inbound.borrow().len()
    }

    /// Reverse the order of the waiting inbound messages
    pub fn reverse_inbound(&mut self) {
        self.inbound.borrow_mut().make_contiguous().reverse();
    }

    /// Discard waiting inbound messages matching `filter`
    ///
    /// Returns how many were dropped.
    pub fn drop_inbound<F>(&mut self, mut filter: F) -> usize
    where
        F: FnMut(&WireMessage) -> bool,
    {
        let mut queue = self.inbound.borrow_mut();
        let before = queue.len();
        queue.retain(|bytes| match WireMessage::decode(bytes) {
            Ok(msg) => !filter(&msg),
            Err(_) => true,
        });
        before - queue.len()
    }

    fn send(&mut self, msg: &WireMessage) {
        if !self.connected {
            return;
        }
        match msg.encode() {
            Ok(bytes) => {
                self.stats.bytes_sent += bytes.len() as u64;
                self.outbound.borrow_mut().push_back(bytes);
            }
            Err(e) => warn!(error = %e, "Failed to encode wire message"),
        }
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) {
        self.connected = true;
        self.stats.state = ConnectionState::Open;
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.stats.state = ConnectionState::Closed;
    }

    fn send_local_input(&mut self, frame: Frame, bits: InputBits) {
        self.send(&WireMessage::Input { frame, bits });
    }

    fn on_remote_input(&mut self, handler: RemoteInputHandler) {
        self.input_handler = Some(handler);
    }

    fn poll(&mut self) {
        if !self.connected || self.hold_inbound {
            return;
        }
        let delivered: Vec<Vec<u8>> = self.inbound.borrow_mut().drain(..).collect();
        for bytes in delivered {
            self.stats.bytes_received += bytes.len() as u64;
            match WireMessage::decode(&bytes) {
                Ok(WireMessage::Input { frame, bits }) => {
                    if let Some(handler) = self.input_handler.as_mut() {
                        handler(frame, bits);
                    }
                }
                Ok(WireMessage::Checksum { frame, checksum }) => {
                    if let Some(handler) = self.checksum_handler.as_mut() {
                        handler(frame, checksum);
                    }
                }
                Ok(WireMessage::Ack { frame }) => {
                    if let Some(handler) = self.ack_handler.as_mut() {
                        handler(frame);
                    }
                }
                Ok(WireMessage::Ping { .. }) | Ok(WireMessage::Renegotiate) => {}
                Err(e) => warn!(error = %e, "Dropping malformed wire message"),
            }
        }
    }

    fn send_checksum(&mut self, frame: Frame, checksum: Checksum) {
        self.send(&WireMessage::Checksum { frame, checksum });
    }

    fn on_remote_checksum(&mut self, handler: RemoteChecksumHandler) {
        self.checksum_handler = Some(handler);
    }

    fn send_input_ack(&mut self, frontier: Frame) {
        self.send(&WireMessage::Ack { frame: frontier });
    }

    fn on_remote_ack(&mut self, handler: RemoteAckHandler) {
        self.ack_handler = Some(handler);
    }

    fn link_stats(&self) -> LinkStats {
        self.stats
    }
}
