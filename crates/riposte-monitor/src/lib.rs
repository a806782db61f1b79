//! Riposte Monitor - Advisory anomaly detection for online matches
//!
//! Independent periodic samplers compare live metrics against fixed
//! thresholds and accumulate typed reports. The monitor never blocks or
//! ends a match; what to do with the evidence (flag for review, show a
//! warning) is up to the application.
//!
//! # Example
//!
//! ```rust,ignore
//! use riposte_monitor::{AnomalyMonitor, MonitorConfig, Telemetry};
//!
//! let mut monitor = AnomalyMonitor::with_default_probe(MonitorConfig::default())?;
//! monitor.start(clock.now_ms());
//!
//! loop {
//!     monitor.record_input();
//!     session.advance_frame(&mut game, input)?;
//!     monitor.poll(clock.now_ms(), &Telemetry {
//!         net: session.net_stats(),
//!         physics_signature: Some(game.signature()),
//!     });
//!     for report in monitor.drain() {
//!         upload(report.to_json()?);
//!     }
//! }
//! ```

mod config;
mod error;
mod monitor;
mod probe;
mod report;

pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use monitor::{AnomalyMonitor, Telemetry};
pub use probe::{CheckpointProbe, TimingProbe};
pub use report::{AnomalyKind, AnomalyReport};
