//! Sampler periods and thresholds

use crate::{Error, Result};
use riposte_core::Frame;
use serde::{Deserialize, Serialize};

/// Configuration for an [`crate::AnomalyMonitor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub input_rate_period_ms: f64,
    pub physics_period_ms: f64,
    pub remote_state_period_ms: f64,
    pub timing_period_ms: f64,

    /// Local inputs per second above which input looks automated
    pub max_inputs_per_second: f64,
    /// Allowed distance of the physics signature from its reference
    pub max_physics_drift: f64,
    /// Rollbacks allowed between two remote-state samples
    pub max_rollbacks: u64,
    pub max_input_delay: Frame,
    pub max_prediction_gap: Frame,
    /// Checkpoint duration that suggests a paused debugger
    pub stall_threshold_ms: f64,

    /// Oldest reports are dropped beyond this many
    pub max_reports: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            input_rate_period_ms: 1000.0,
            physics_period_ms: 2000.0,
            remote_state_period_ms: 1500.0,
            timing_period_ms: 5000.0,
            max_inputs_per_second: 120.0,
            max_physics_drift: 1e6,
            max_rollbacks: 120,
            max_input_delay: 8,
            max_prediction_gap: 15,
            stall_threshold_ms: 160.0,
            max_reports: 1024,
        }
    }
}

impl MonitorConfig {
    /// Parse a RON document and validate it
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: MonitorConfig =
            ron::from_str(source).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("input_rate_period_ms", self.input_rate_period_ms),
            ("physics_period_ms", self.physics_period_ms),
            ("remote_state_period_ms", self.remote_state_period_ms),
            ("timing_period_ms", self.timing_period_ms),
        ];
        for (name, value) in periods {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a positive number of milliseconds"
                )));
            }
        }
        if self.max_reports == 0 {
            return Err(Error::InvalidConfig(
                "max_reports must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_inputs_per_second, 120.0);
        assert_eq!(config.max_prediction_gap, 15);
    }

    #[test]
    fn test_from_ron() {
        let config = MonitorConfig::from_ron("(max_rollbacks: 60, timing_period_ms: 10000.0)").unwrap();
        assert_eq!(config.max_rollbacks, 60);
        assert_eq!(config.timing_period_ms, 10000.0);
        assert_eq!(config.max_input_delay, 8);

        assert!(MonitorConfig::from_ron("(physics_period_ms: 0.0)").is_err());
    }
}
