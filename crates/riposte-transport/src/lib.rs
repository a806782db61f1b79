//! Riposte Transport - Low-latency peer-to-peer input channel
//!
//! This crate provides the production [`riposte_netcode::Transport`]:
//!
//! - **Signaling**: Offer/answer and candidate exchange over any side channel
//! - **Peer Link**: Unordered, unreliable datagram channel (UDP)
//! - **Heartbeat**: RTT and jitter from echoed pings
//! - **Reconnection**: Fresh channel and renegotiation when the link drops
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   LowLatencyTransport                       │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │  Signaling   │─▶│  Peer Link   │─▶│   Wire Codec     │  │
//! │  │ (offer/ice)  │  │   (UDP)      │  │ (input/ping/..)  │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! │         ▲                  │                   │            │
//! │         │                  ▼                   ▼            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ Reconnection │◀─│  Heartbeat   │  │  Link Quality    │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use riposte_core::SystemClock;
//! use riposte_netcode::Transport;
//! use riposte_transport::{LowLatencyTransport, MemorySignaling, Role, TransportConfig, UdpLink};
//!
//! let config = TransportConfig::default();
//! let link = UdpLink::new("0.0.0.0".parse()?, &config);
//! let mut transport = LowLatencyTransport::new(
//!     Role::Originator,
//!     config,
//!     link,
//!     lobby_signaling,
//!     Arc::new(SystemClock::new()),
//! )?;
//! transport.connect();
//! ```

mod config;
mod error;
mod link;
mod quality;
mod signaling;
mod transport;
mod udp;

pub use config::TransportConfig;
pub use error::{Error, Result};
pub use link::{LinkEvent, LinkState, PeerLink};
pub use quality::LinkQuality;
pub use signaling::{
    Candidate, MemorySignaling, SdpKind, SessionDescription, SignalMessage, SignalingChannel,
};
pub use transport::{LowLatencyTransport, Role};
pub use udp::UdpLink;
