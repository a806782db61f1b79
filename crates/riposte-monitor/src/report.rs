//! Anomaly reports
//!
//! Reports serialize with a `type` tag and a `details` object:
//!
//! ```text
//! {"type": "input_rate",
//!  "details": {"count": 150, "per_second": 150.0, "threshold": 120.0},
//!  "frame": 3600, "timestamp": "2026-01-01T12:00:00Z"}
//! ```

use chrono::{DateTime, Utc};
use riposte_core::Frame;
use serde::{Deserialize, Serialize};

/// What a sampler observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum AnomalyKind {
    InputRate {
        /// Raw inputs recorded over the sampling interval
        count: u64,
        /// `count` normalized by the time actually elapsed
        per_second: f64,
        threshold: f64,
    },
    PhysicsDivergence {
        signature: f64,
        reference: f64,
        drift: f64,
    },
    ExcessiveRollbacks {
        /// Rollbacks since the previous remote-state sample
        rollbacks: u64,
        threshold: u64,
    },
    HighInputDelay {
        input_delay: Frame,
        threshold: Frame,
    },
    LargePredictionGap {
        gap: Frame,
        threshold: Frame,
    },
    DevtoolsDetected {
        elapsed_ms: f64,
        threshold_ms: f64,
    },
}

impl AnomalyKind {
    /// The serialized `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            AnomalyKind::InputRate { .. } => "input_rate",
            AnomalyKind::PhysicsDivergence { .. } => "physics_divergence",
            AnomalyKind::ExcessiveRollbacks { .. } => "excessive_rollbacks",
            AnomalyKind::HighInputDelay { .. } => "high_input_delay",
            AnomalyKind::LargePredictionGap { .. } => "large_prediction_gap",
            AnomalyKind::DevtoolsDetected { .. } => "devtools_detected",
        }
    }
}

/// One piece of advisory evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    #[serde(flatten)]
    pub kind: AnomalyKind,
    /// Simulation frame when the sample was taken
    pub frame: Frame,
    pub timestamp: DateTime<Utc>,
}

impl AnomalyReport {
    pub fn new(kind: AnomalyKind, frame: Frame) -> Self {
        Self {
            kind,
            frame,
            timestamp: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
