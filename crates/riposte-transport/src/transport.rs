//! Low-latency transport
//!
//! Implements the netcode [`Transport`] contract on top of a negotiated
//! [`PeerLink`] and a [`SignalingChannel`]. Everything is driven from
//! [`Transport::poll`]: signaling, link I/O, the heartbeat timer and
//! reconnection retries all advance there, on the caller's thread.
//!
//! # Connection lifecycle
//!
//! ```text
//!   Idle ──connect()──▶ Connecting ──Opened──▶ Open
//!                           │                   │ Failed / Closed
//!                           │ Failed            ▼
//!                           └──────────▶ Reconnecting ──Opened──▶ Open
//!                                               │ retry every reconnect_interval_ms
//!   any ──disconnect()──▶ Closed ──connect()──▶ Connecting
//! ```
//!
//! On reconnection the originating peer opens a fresh channel and sends a
//! new offer; the responding peer asks for one with `{renegotiate: true}`
//! and waits.

use crate::config::TransportConfig;
use crate::link::{LinkEvent, PeerLink};
use crate::quality::LinkQuality;
use crate::signaling::{SdpKind, SessionDescription, SignalMessage, SignalingChannel};
use crate::Result;
use riposte_core::{Checksum, Clock, Frame, InputBits};
use riposte_netcode::{
    ConnectionState, LinkStats, RemoteAckHandler, RemoteChecksumHandler, RemoteInputHandler,
    Transport, WireMessage,
};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Which side of the negotiation this peer plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Creates the data channel and sends offers
    Originator,
    /// Waits for offers and answers them
    Responder,
}

/// [`Transport`] over a negotiated peer link with heartbeat and reconnection
pub struct LowLatencyTransport<L: PeerLink, G: SignalingChannel> {
    role: Role,
    config: TransportConfig,
    link: L,
    signaling: G,
    clock: Arc<dyn Clock>,
    state: ConnectionState,
    generation: u32,
    quality: LinkQuality,
    input_handler: Option<RemoteInputHandler>,
    checksum_handler: Option<RemoteChecksumHandler>,
    ack_handler: Option<RemoteAckHandler>,
    next_heartbeat: Option<f64>,
    next_reconnect: Option<f64>,
    reconnect_attempts: u32,
}

impl<L: PeerLink, G: SignalingChannel> LowLatencyTransport<L, G> {
    /// Create an idle transport; nothing happens until `connect`
    pub fn new(
        role: Role,
        config: TransportConfig,
        link: L,
        signaling: G,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            role,
            quality: LinkQuality::new(config.jitter_smoothing),
            config,
            link,
            signaling,
            clock,
            state: ConnectionState::Idle,
            generation: 0,
            input_handler: None,
            checksum_handler: None,
            ack_handler: None,
            next_heartbeat: None,
            next_reconnect: None,
            reconnect_attempts: 0,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current negotiation generation
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    fn send_signal(&mut self, message: SignalMessage) {
        if let Err(e) = self.signaling.send(message) {
            warn!(error = %e, "Failed to send signaling message");
        }
    }

    fn flush_candidates(&mut self) {
        for candidate in self.link.local_candidates() {
            self.send_signal(SignalMessage::Ice(candidate));
        }
    }

    /// Open a fresh channel and offer it to the peer
    fn start_offer(&mut self) {
        self.generation += 1;
        match self.link.create_offer(self.generation) {
            Ok(offer) => {
                debug!(generation = self.generation, "Sending offer");
                self.send_signal(SignalMessage::Sdp(offer));
                self.flush_candidates();
            }
            Err(e) => warn!(generation = self.generation, error = %e, "Failed to create offer"),
        }
    }

    fn send_wire(&mut self, message: &WireMessage) {
        if self.state != ConnectionState::Open {
            return;
        }
        let bytes = match message.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode wire message");
                return;
            }
        };
        match self.link.send(&bytes) {
            Ok(()) => self.quality.record_sent(bytes.len()),
            Err(e) => trace!(error = %e, "Dropped outgoing message"),
        }
    }

    fn pump_signaling(&mut self, now: f64) {
        loop {
            match self.signaling.try_recv() {
                Ok(Some(message)) => self.handle_signal(message, now),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Signaling channel unavailable");
                    break;
                }
            }
        }
    }

    fn handle_signal(&mut self, message: SignalMessage, now: f64) {
        match (message, self.role) {
            (SignalMessage::Sdp(offer), Role::Responder) if offer.kind == SdpKind::Offer => {
                self.answer_offer(offer)
            }
            (SignalMessage::Sdp(answer), Role::Originator) if answer.kind == SdpKind::Answer => {
                if answer.generation != self.generation {
                    trace!(generation = answer.generation, "Ignoring stale answer");
                    return;
                }
                if let Err(e) = self.link.accept_answer(&answer) {
                    warn!(error = %e, "Failed to apply answer");
                }
            }
            (SignalMessage::Sdp(desc), role) => {
                warn!(?role, kind = ?desc.kind, "Unexpected session description ignored")
            }
            (SignalMessage::Ice(candidate), _) => {
                if candidate.generation != self.generation {
                    trace!(generation = candidate.generation, "Ignoring stale candidate");
                    return;
                }
                if let Err(e) = self.link.add_candidate(&candidate) {
                    debug!(error = %e, "Candidate rejected");
                }
            }
            (SignalMessage::Renegotiate(true), Role::Originator) => {
                self.peer_requested_renegotiation(now)
            }
            (SignalMessage::Renegotiate(_), _) => {}
        }
    }

    fn answer_offer(&mut self, offer: SessionDescription) {
        if offer.generation < self.generation {
            trace!(generation = offer.generation, "Ignoring stale offer");
            return;
        }
        match self.link.accept_offer(&offer) {
            Ok(answer) => {
                self.generation = offer.generation;
                debug!(generation = self.generation, "Answering offer");
                self.send_signal(SignalMessage::Sdp(answer));
                self.flush_candidates();
            }
            Err(e) => warn!(generation = offer.generation, error = %e, "Failed to accept offer"),
        }
    }

    fn peer_requested_renegotiation(&mut self, now: f64) {
        if self.state == ConnectionState::Reconnecting {
            // A retry is already scheduled; answer the request right away
            self.attempt_reconnect(now);
        } else {
            self.begin_reconnect(now, "peer requested renegotiation");
        }
    }

    fn handle_link_event(&mut self, event: LinkEvent, now: f64) {
        match event {
            LinkEvent::Opened => {
                info!(generation = self.generation, from = ?self.state, "Connection open");
                self.state = ConnectionState::Open;
                self.next_reconnect = None;
                self.next_heartbeat = Some(now);
            }
            LinkEvent::Message(bytes) => self.handle_message(&bytes, now),
            LinkEvent::Closed => self.begin_reconnect(now, "data channel closed"),
            LinkEvent::Failed(reason) => self.begin_reconnect(now, &reason),
        }
    }

    fn handle_message(&mut self, bytes: &[u8], now: f64) {
        self.quality.record_received(bytes.len());
        let message = match WireMessage::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed wire message");
                return;
            }
        };

        match message {
            WireMessage::Input { frame, bits } => {
                self.quality.record_frame(frame);
                if let Some(handler) = self.input_handler.as_mut() {
                    handler(frame, bits);
                }
            }
            WireMessage::Ping {
                timestamp,
                echo: false,
            } => self.send_wire(&WireMessage::Ping {
                timestamp,
                echo: true,
            }),
            WireMessage::Ping {
                timestamp,
                echo: true,
            } => {
                let rtt = now - timestamp;
                self.quality.record_rtt(rtt);
                trace!(rtt, jitter = self.quality.jitter(), "Heartbeat echo");
            }
            WireMessage::Renegotiate => {
                if self.role == Role::Originator {
                    self.peer_requested_renegotiation(now);
                }
            }
            WireMessage::Checksum { frame, checksum } => {
                if let Some(handler) = self.checksum_handler.as_mut() {
                    handler(frame, checksum);
                }
            }
            WireMessage::Ack { frame } => {
                if let Some(handler) = self.ack_handler.as_mut() {
                    handler(frame);
                }
            }
        }
    }

    fn begin_reconnect(&mut self, now: f64, reason: &str) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if self.state == ConnectionState::Reconnecting {
            // Retry timer already running
            debug!(reason, "Reconnection attempt did not complete");
            return;
        }
        warn!(reason, generation = self.generation, "Connection lost, reconnecting");
        if self.role == Role::Responder {
            // Best effort; the channel is usually already gone
            self.send_wire(&WireMessage::Renegotiate);
        }
        self.state = ConnectionState::Reconnecting;
        self.next_heartbeat = None;
        self.attempt_reconnect(now);
    }

    fn attempt_reconnect(&mut self, now: f64) {
        self.reconnect_attempts += 1;
        self.next_reconnect = Some(now + self.config.reconnect_interval_ms);
        info!(
            attempt = self.reconnect_attempts,
            role = ?self.role,
            "Reconnection attempt"
        );
        match self.role {
            Role::Originator => self.start_offer(),
            Role::Responder => self.send_signal(SignalMessage::Renegotiate(true)),
        }
    }

    fn tick_heartbeat(&mut self, now: f64) {
        if self.state != ConnectionState::Open {
            return;
        }
        if self.next_heartbeat.is_some_and(|due| now >= due) {
            self.send_wire(&WireMessage::Ping {
                timestamp: now,
                echo: false,
            });
            self.next_heartbeat = Some(now + self.config.heartbeat_interval_ms);
        }
    }

    fn tick_reconnect(&mut self, now: f64) {
        if self.state != ConnectionState::Reconnecting {
            return;
        }
        if self.next_reconnect.is_some_and(|due| now >= due) {
            self.attempt_reconnect(now);
        }
    }
}

impl<L: PeerLink, G: SignalingChannel> Transport for LowLatencyTransport<L, G> {
    fn connect(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Reconnecting
        ) {
            debug!(state = ?self.state, "Already connecting");
            return;
        }
        info!(role = ?self.role, "Connecting");
        self.state = ConnectionState::Connecting;
        if self.role == Role::Originator {
            self.start_offer();
        }
    }

    fn disconnect(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.next_heartbeat = None;
        self.next_reconnect = None;
        self.link.close();
        self.state = ConnectionState::Closed;
        info!(generation = self.generation, "Disconnected");
    }

    fn send_local_input(&mut self, frame: Frame, bits: InputBits) {
        self.send_wire(&WireMessage::Input { frame, bits });
    }

    fn on_remote_input(&mut self, handler: RemoteInputHandler) {
        self.input_handler = Some(handler);
    }

    fn poll(&mut self) {
        if matches!(self.state, ConnectionState::Idle | ConnectionState::Closed) {
            return;
        }
        let now = self.clock.now_ms();

        self.pump_signaling(now);
        for event in self.link.poll(now) {
            self.handle_link_event(event, now);
        }
        self.flush_candidates();
        self.tick_heartbeat(now);
        self.tick_reconnect(now);
    }

    fn send_checksum(&mut self, frame: Frame, checksum: Checksum) {
        self.send_wire(&WireMessage::Checksum { frame, checksum });
    }

    fn on_remote_checksum(&mut self, handler: RemoteChecksumHandler) {
        self.checksum_handler = Some(handler);
    }

    fn send_input_ack(&mut self, frontier: Frame) {
        self.send_wire(&WireMessage::Ack { frame: frontier });
    }

    fn on_remote_ack(&mut self, handler: RemoteAckHandler) {
        self.ack_handler = Some(handler);
    }

    fn link_stats(&self) -> LinkStats {
        LinkStats {
            rtt_ms: self.quality.rtt(),
            jitter_ms: self.quality.jitter(),
            bytes_sent: self.quality.bytes_sent(),
            bytes_received: self.quality.bytes_received(),
            out_of_order: self.quality.out_of_order(),
            loss_suspect: self.quality.loss_suspect(),
            state: self.state,
            reconnect_attempts: self.reconnect_attempts,
        }
    }
}

impl<L: PeerLink, G: SignalingChannel> Drop for LowLatencyTransport<L, G> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
