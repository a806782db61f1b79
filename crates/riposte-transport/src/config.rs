//! Transport configuration
//!
//! # Example
//!
//! ```
//! use riposte_transport::TransportConfig;
//!
//! let config = TransportConfig::from_ron("(heartbeat_interval_ms: 250.0)").unwrap();
//! assert_eq!(config.heartbeat_interval_ms, 250.0);
//! assert_eq!(config.jitter_smoothing, 0.25);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Timers and smoothing for a [`crate::LowLatencyTransport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Milliseconds between heartbeat pings while the channel is open
    pub heartbeat_interval_ms: f64,
    /// Weight of each new sample in the jitter moving average
    pub jitter_smoothing: f64,
    /// Milliseconds between reconnection attempts
    pub reconnect_interval_ms: f64,
    /// Give up on a negotiation that has not opened after this long
    pub connect_timeout_ms: f64,
    /// Declare an open channel dead after this long without traffic
    pub link_timeout_ms: f64,
    /// Milliseconds between connectivity probes while connecting
    pub probe_interval_ms: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 500.0,
            jitter_smoothing: 0.25,
            reconnect_interval_ms: 2000.0,
            connect_timeout_ms: 5000.0,
            link_timeout_ms: 3000.0,
            probe_interval_ms: 100.0,
        }
    }
}

impl TransportConfig {
    /// Parse a RON document and validate it
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: TransportConfig =
            ron::from_str(source).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can drive the timers
    pub fn validate(&self) -> Result<()> {
        let timers = [
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("reconnect_interval_ms", self.reconnect_interval_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("link_timeout_ms", self.link_timeout_ms),
            ("probe_interval_ms", self.probe_interval_ms),
        ];
        for (name, value) in timers {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a positive number of milliseconds"
                )));
            }
        }
        if !(self.jitter_smoothing > 0.0 && self.jitter_smoothing <= 1.0) {
            return Err(Error::InvalidConfig(
                "jitter_smoothing must be in (0, 1]".to_string(),
            ));
        }
        if self.link_timeout_ms <= self.heartbeat_interval_ms {
            return Err(Error::InvalidConfig(
                "link_timeout_ms must exceed heartbeat_interval_ms".to_string(),
            ));
        }
        Ok(())
    }
}
