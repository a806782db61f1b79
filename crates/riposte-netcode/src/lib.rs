//! Riposte Netcode - Peer-to-peer rollback for two-player fighting games
//!
//! This crate keeps two peers in lock-step without waiting on the network:
//!
//! - **Input Buffering**: Local inputs delayed a few frames, remote inputs
//!   confirmed or predicted
//! - **Prediction**: Guess the remote input so the simulation never stalls
//! - **Rollback**: Restore a snapshot and resimulate when a guess was wrong
//! - **Determinism Validation**: Compare per-frame checksums across peers
//! - **Transport**: The contract any input channel has to meet
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RollbackSession                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ Local Inputs │─▶│  Simulation  │─▶│    Checksums     │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! │         │                  ▲                   │            │
//! │         ▼                  │                   ▼            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │  Transport   │─▶│Remote Inputs │  │    Validator     │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! │                            │                                │
//! │                            ▼                                │
//! │                   ┌──────────────────┐                      │
//! │                   │ Snapshot Ring    │ (rollback target)    │
//! │                   └──────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use riposte_netcode::{RollbackSession, SessionConfig, Transport};
//!
//! let mut transport = MyTransport::new();
//! transport.connect();
//! let mut session = RollbackSession::new(SessionConfig::default(), transport)?;
//!
//! loop {
//!     let input = read_controller();
//!     match session.advance_frame(&mut game, input) {
//!         Ok(report) => {
//!             if let Some(frame) = report.desync_frame {
//!                 log_desync(frame);
//!             }
//!         }
//!         Err(e) if e.is_fatal() => break,
//!         Err(e) => log_error(e),
//!     }
//!     render(&game);
//! }
//! ```

mod config;
mod error;
mod input_buffer;
pub mod memory;
mod message;
mod prediction;
mod session;
mod stats;
mod transport;
mod validator;

pub use config::{SessionConfig, MAX_INPUT_DELAY};
pub use error::{Error, Result};
pub use input_buffer::{Confirmation, LocalInputs, RemoteInputs};
pub use message::WireMessage;
pub use prediction::PredictionPolicy;
pub use session::{FrameReport, RollbackInfo, RollbackSession};
pub use stats::{NetStats, QualityGrade};
pub use transport::{
    ConnectionState, LinkStats, RemoteAckHandler, RemoteChecksumHandler, RemoteInputHandler,
    Transport,
};
pub use validator::{DeterminismStatus, DeterminismValidator};

// Re-export core types for convenience
pub use riposte_core::{Checksum, Frame, InputBits, PlayerSlot, Simulation};
