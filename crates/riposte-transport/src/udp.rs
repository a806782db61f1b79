//! UDP data channel
//!
//! Each negotiation generation binds its own non-blocking socket on an
//! ephemeral port, advertises that address as its only candidate, and
//! probes the peer's candidates until one answers. Datagrams are framed
//! with bincode and tagged with the generation so strays from an older
//! channel are ignored.
//!
//! ```text
//!   originator                      responder
//!   create_offer(g) ── offer ─────▶ accept_offer(g)
//!                   ◀──── answer ──
//!   probe ──────────────────────────▶ (candidate known) open, ack
//!   open ◀──────────────────────────── probe ack
//! ```

use crate::config::TransportConfig;
use crate::link::{LinkEvent, LinkState, PeerLink};
use crate::signaling::{Candidate, SdpKind, SessionDescription};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use tracing::{debug, trace, warn};

/// Largest datagram accepted
const MAX_DATAGRAM: usize = 2048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinkFrame {
    generation: u32,
    payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Payload {
    /// Connectivity check; answered with `ack: true`
    Probe { ack: bool },
    Data(Vec<u8>),
    Close,
}

/// [`PeerLink`] over a plain UDP socket
pub struct UdpLink {
    bind_ip: IpAddr,
    connect_timeout_ms: f64,
    link_timeout_ms: f64,
    probe_interval_ms: f64,
    socket: Option<UdpSocket>,
    generation: u32,
    state: LinkState,
    remote_candidates: Vec<SocketAddr>,
    peer: Option<SocketAddr>,
    gathered: Vec<Candidate>,
    connecting_since: Option<f64>,
    last_heard: f64,
    last_probe: Option<f64>,
    events: Vec<LinkEvent>,
}

impl UdpLink {
    /// Create a link that binds its sockets on `bind_ip`
    pub fn new(bind_ip: IpAddr, config: &TransportConfig) -> Self {
        Self {
            bind_ip,
            connect_timeout_ms: config.connect_timeout_ms,
            link_timeout_ms: config.link_timeout_ms,
            probe_interval_ms: config.probe_interval_ms,
            socket: None,
            generation: 0,
            state: LinkState::Idle,
            remote_candidates: Vec::new(),
            peer: None,
            gathered: Vec::new(),
            connecting_since: None,
            last_heard: 0.0,
            last_probe: None,
            events: Vec::new(),
        }
    }

    /// Address of the current socket, if one is bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Replace the current channel with a fresh socket for `generation`
    fn open_channel(&mut self, generation: u32) -> Result<SocketAddr> {
        self.close();

        let socket = UdpSocket::bind((self.bind_ip, 0))?;
        socket.set_nonblocking(true)?;
        let addr = socket.local_addr()?;

        self.socket = Some(socket);
        self.generation = generation;
        self.state = LinkState::Connecting;
        self.remote_candidates.clear();
        self.peer = None;
        self.gathered = vec![Candidate { generation, addr }];
        self.connecting_since = None;
        self.last_probe = None;
        debug!(generation, %addr, "Opened fresh data channel");
        Ok(addr)
    }

    fn add_remote(&mut self, addr: SocketAddr) {
        if !self.remote_candidates.contains(&addr) {
            self.remote_candidates.push(addr);
        }
    }

    fn send_frame(&self, to: SocketAddr, payload: Payload) -> Result<()> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(Error::NotOpen);
        };
        let frame = LinkFrame {
            generation: self.generation,
            payload,
        };
        let bytes = bincode::serialize(&frame)?;
        match socket.send_to(&bytes, to) {
            Ok(_) => Ok(()),
            // Unreliable channel: a full send buffer is a lost packet
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn open(&mut self, peer: SocketAddr) {
        self.peer = Some(peer);
        self.state = LinkState::Open;
        self.events.push(LinkEvent::Opened);
        debug!(generation = self.generation, %peer, "Data channel open");
    }

    fn fail(&mut self, reason: &str) {
        self.state = LinkState::Failed;
        self.events.push(LinkEvent::Failed(reason.to_string()));
        warn!(generation = self.generation, reason, "Data channel failed");
    }

    fn receive(&mut self, now_ms: f64) {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let Some(socket) = self.socket.as_ref() else {
                return;
            };
            let (len, from) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    debug!(error = %e, "UDP receive error");
                    return;
                }
            };
            let frame: LinkFrame = match bincode::deserialize(&buf[..len]) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(%from, error = %e, "Dropping malformed datagram");
                    continue;
                }
            };
            if frame.generation != self.generation {
                trace!(%from, generation = frame.generation, "Ignoring datagram from stale channel");
                continue;
            }
            self.handle_frame(from, frame.payload, now_ms);
        }
    }

    fn handle_frame(&mut self, from: SocketAddr, payload: Payload, now_ms: f64) {
        let known = match self.state {
            LinkState::Open => self.peer == Some(from),
            LinkState::Connecting => self.remote_candidates.contains(&from),
            _ => false,
        };
        if !known {
            trace!(%from, "Ignoring datagram from unknown address");
            return;
        }

        self.last_heard = now_ms;
        if self.state == LinkState::Connecting && !matches!(payload, Payload::Close) {
            self.open(from);
        }

        match payload {
            Payload::Probe { ack: false } => {
                if let Err(e) = self.send_frame(from, Payload::Probe { ack: true }) {
                    debug!(error = %e, "Failed to answer probe");
                }
            }
            Payload::Probe { ack: true } => {}
            Payload::Data(bytes) => self.events.push(LinkEvent::Message(bytes)),
            Payload::Close => {
                self.state = LinkState::Closed;
                self.socket = None;
                self.events.push(LinkEvent::Closed);
                debug!(generation = self.generation, "Peer closed data channel");
            }
        }
    }

    fn probe(&mut self, now_ms: f64) {
        let due = self
            .last_probe
            .map_or(true, |last| now_ms - last >= self.probe_interval_ms);
        if !due {
            return;
        }
        self.last_probe = Some(now_ms);
        for &addr in &self.remote_candidates {
            if let Err(e) = self.send_frame(addr, Payload::Probe { ack: false }) {
                debug!(%addr, error = %e, "Probe failed");
            }
        }
    }
}

impl PeerLink for UdpLink {
    fn create_offer(&mut self, generation: u32) -> Result<SessionDescription> {
        let addr = self.open_channel(generation)?;
        Ok(SessionDescription {
            kind: SdpKind::Offer,
            generation,
            addr,
        })
    }

    fn accept_offer(&mut self, offer: &SessionDescription) -> Result<SessionDescription> {
        let addr = self.open_channel(offer.generation)?;
        self.add_remote(offer.addr);
        Ok(SessionDescription {
            kind: SdpKind::Answer,
            generation: offer.generation,
            addr,
        })
    }

    fn accept_answer(&mut self, answer: &SessionDescription) -> Result<()> {
        if answer.generation != self.generation {
            return Err(Error::StaleGeneration {
                expected: self.generation,
                got: answer.generation,
            });
        }
        self.add_remote(answer.addr);
        Ok(())
    }

    fn add_candidate(&mut self, candidate: &Candidate) -> Result<()> {
        if candidate.generation != self.generation {
            return Err(Error::StaleGeneration {
                expected: self.generation,
                got: candidate.generation,
            });
        }
        self.add_remote(candidate.addr);
        Ok(())
    }

    fn local_candidates(&mut self) -> Vec<Candidate> {
        std::mem::take(&mut self.gathered)
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        match (self.state, self.peer) {
            (LinkState::Open, Some(peer)) => self.send_frame(peer, Payload::Data(payload.to_vec())),
            _ => Err(Error::NotOpen),
        }
    }

    fn poll(&mut self, now_ms: f64) -> Vec<LinkEvent> {
        if self.socket.is_some() {
            self.receive(now_ms);
        }

        match self.state {
            LinkState::Connecting => {
                let since = *self.connecting_since.get_or_insert(now_ms);
                if now_ms - since > self.connect_timeout_ms {
                    self.fail("connect timeout");
                } else {
                    self.probe(now_ms);
                }
            }
            LinkState::Open => {
                if now_ms - self.last_heard > self.link_timeout_ms {
                    self.fail("peer silent");
                }
            }
            _ => {}
        }

        std::mem::take(&mut self.events)
    }

    fn close(&mut self) {
        if let (Some(peer), LinkState::Open) = (self.peer, self.state) {
            let _ = self.send_frame(peer, Payload::Close);
        }
        if self.socket.take().is_some() {
            debug!(generation = self.generation, "Closed data channel");
        }
        self.peer = None;
        if self.state != LinkState::Idle {
            self.state = LinkState::Closed;
        }
    }

    fn state(&self) -> LinkState {
        self.state
    }
}
