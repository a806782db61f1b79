//! Periodic anomaly samplers
//!
//! Four independent samplers run off one `poll(now, ..)` call:
//!
//! | Sampler      | Default period | Reports                                      |
//! |--------------|----------------|----------------------------------------------|
//! | input rate   | 1000 ms        | `input_rate`                                 |
//! | physics      | 2000 ms        | `physics_divergence`                         |
//! | remote state | 1500 ms        | `excessive_rollbacks`, `high_input_delay`, `large_prediction_gap` |
//! | timing       | 5000 ms        | `devtools_detected`                          |
//!
//! Nothing here touches the match. Reports pile up until the application
//! drains them.

use crate::config::MonitorConfig;
use crate::probe::{CheckpointProbe, TimingProbe};
use crate::report::{AnomalyKind, AnomalyReport};
use crate::Result;
use riposte_core::Frame;
use riposte_netcode::NetStats;
use tracing::{debug, warn};

/// Live values the samplers read
#[derive(Debug, Clone, Copy, Default)]
pub struct Telemetry {
    pub net: NetStats,
    /// Scalar summary of the simulation, if the game provides one
    pub physics_signature: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Sampler {
    period_ms: f64,
    next_due: f64,
}

impl Sampler {
    fn new(period_ms: f64) -> Self {
        Self {
            period_ms,
            next_due: period_ms,
        }
    }

    fn schedule_from(&mut self, now: f64) {
        self.next_due = now + self.period_ms;
    }

    /// Whether the sampler should run; reschedules it if so
    fn fire(&mut self, now: f64) -> bool {
        if now < self.next_due {
            return false;
        }
        self.schedule_from(now);
        true
    }
}

/// Advisory monitor accumulating [`AnomalyReport`]s
pub struct AnomalyMonitor<P: TimingProbe = CheckpointProbe> {
    config: MonitorConfig,
    probe: P,
    started: bool,
    input_rate: Sampler,
    physics: Sampler,
    remote_state: Sampler,
    timing: Sampler,
    inputs_since_sample: u64,
    last_input_sample: f64,
    physics_reference: Option<f64>,
    rollbacks_at_last_sample: u64,
    reports: Vec<AnomalyReport>,
}

impl AnomalyMonitor<CheckpointProbe> {
    /// Create a monitor timing the default checkpoint
    pub fn with_default_probe(config: MonitorConfig) -> Result<Self> {
        Self::new(config, CheckpointProbe::default())
    }
}

impl<P: TimingProbe> AnomalyMonitor<P> {
    pub fn new(config: MonitorConfig, probe: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            input_rate: Sampler::new(config.input_rate_period_ms),
            physics: Sampler::new(config.physics_period_ms),
            remote_state: Sampler::new(config.remote_state_period_ms),
            timing: Sampler::new(config.timing_period_ms),
            config,
            probe,
            started: false,
            inputs_since_sample: 0,
            last_input_sample: 0.0,
            physics_reference: None,
            rollbacks_at_last_sample: 0,
            reports: Vec::new(),
        })
    }

    /// Start every sampler's period at `now`
    ///
    /// Called implicitly by the first `poll` if not called before.
    pub fn start(&mut self, now: f64) {
        for sampler in [
            &mut self.input_rate,
            &mut self.physics,
            &mut self.remote_state,
            &mut self.timing,
        ] {
            sampler.schedule_from(now);
        }
        self.inputs_since_sample = 0;
        self.last_input_sample = now;
        self.rollbacks_at_last_sample = 0;
        self.started = true;
        debug!(now, "Anomaly monitor started");
    }

    /// Count one local input
    pub fn record_input(&mut self) {
        self.record_inputs(1);
    }

    pub fn record_inputs(&mut self, count: u64) {
        self.inputs_since_sample += count;
    }

    /// Use `signature` as the physics reference instead of the first sample
    pub fn set_physics_reference(&mut self, signature: f64) {
        self.physics_reference = Some(signature);
    }

    /// Run every sampler that is due
    ///
    /// Returns how many reports were added.
    pub fn poll(&mut self, now: f64, telemetry: &Telemetry) -> usize {
        if !self.started {
            self.start(now);
            return 0;
        }
        let before = self.reports.len();
        let frame = telemetry.net.current_frame;

        if self.input_rate.fire(now) {
            self.sample_input_rate(now, frame);
        }
        if self.physics.fire(now) {
            self.sample_physics(telemetry.physics_signature, frame);
        }
        if self.remote_state.fire(now) {
            self.sample_remote_state(&telemetry.net);
        }
        if self.timing.fire(now) {
            self.sample_timing(frame);
        }

        self.reports.len().saturating_sub(before)
    }

    fn sample_input_rate(&mut self, now: f64, frame: Frame) {
        let elapsed = now - self.last_input_sample;
        let count = std::mem::take(&mut self.inputs_since_sample);
        self.last_input_sample = now;
        if elapsed <= 0.0 {
            return;
        }

        let per_second = count as f64 * 1000.0 / elapsed;
        if per_second > self.config.max_inputs_per_second {
            self.push(
                AnomalyKind::InputRate {
                    count,
                    per_second,
                    threshold: self.config.max_inputs_per_second,
                },
                frame,
            );
        }
    }

    fn sample_physics(&mut self, signature: Option<f64>, frame: Frame) {
        let Some(signature) = signature else {
            return;
        };
        let Some(reference) = self.physics_reference else {
            self.physics_reference = Some(signature);
            return;
        };

        let drift = (signature - reference).abs();
        if drift > self.config.max_physics_drift {
            self.push(
                AnomalyKind::PhysicsDivergence {
                    signature,
                    reference,
                    drift,
                },
                frame,
            );
        }
    }

    fn sample_remote_state(&mut self, net: &NetStats) {
        let rollbacks = net.rollbacks.saturating_sub(self.rollbacks_at_last_sample);
        self.rollbacks_at_last_sample = net.rollbacks;

        if rollbacks > self.config.max_rollbacks {
            self.push(
                AnomalyKind::ExcessiveRollbacks {
                    rollbacks,
                    threshold: self.config.max_rollbacks,
                },
                net.current_frame,
            );
        }
        if net.input_delay > self.config.max_input_delay {
            self.push(
                AnomalyKind::HighInputDelay {
                    input_delay: net.input_delay,
                    threshold: self.config.max_input_delay,
                },
                net.current_frame,
            );
        }
        if net.prediction_gap > self.config.max_prediction_gap {
            self.push(
                AnomalyKind::LargePredictionGap {
                    gap: net.prediction_gap,
                    threshold: self.config.max_prediction_gap,
                },
                net.current_frame,
            );
        }
    }

    fn sample_timing(&mut self, frame: Frame) {
        let elapsed_ms = self.probe.measure_ms();
        if elapsed_ms > self.config.stall_threshold_ms {
            self.push(
                AnomalyKind::DevtoolsDetected {
                    elapsed_ms,
                    threshold_ms: self.config.stall_threshold_ms,
                },
                frame,
            );
        }
    }

    fn push(&mut self, kind: AnomalyKind, frame: Frame) {
        warn!(kind = kind.name(), frame, details = ?kind, "Anomaly detected");
        if self.reports.len() >= self.config.max_reports {
            let excess = self.reports.len() + 1 - self.config.max_reports;
            self.reports.drain(..excess);
        }
        self.reports.push(AnomalyReport::new(kind, frame));
    }

    /// Reports accumulated so far, oldest first
    pub fn reports(&self) -> &[AnomalyReport] {
        &self.reports
    }

    /// Take every accumulated report
    pub fn drain(&mut self) -> Vec<AnomalyReport> {
        std::mem::take(&mut self.reports)
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
