//! Debugger timing probe
//!
//! Stepping through code under a debugger stretches wall-clock time across
//! otherwise trivial work. The probe times a fixed checkpoint; the monitor
//! compares the result against a threshold. Slow machines and preemption
//! produce false positives, so the result is only ever evidence.

use std::hint::black_box;
use std::time::Instant;

/// Measures how long a fixed checkpoint takes
pub trait TimingProbe {
    /// Wall-clock milliseconds spent in the checkpoint
    fn measure_ms(&mut self) -> f64;
}

/// Times a loop the optimizer cannot remove
#[derive(Debug, Clone)]
pub struct CheckpointProbe {
    iterations: u32,
}

impl CheckpointProbe {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }
}

impl Default for CheckpointProbe {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl TimingProbe for CheckpointProbe {
    fn measure_ms(&mut self) -> f64 {
        let start = Instant::now();
        let mut acc = 0u64;
        for i in 0..self.iterations {
            acc = black_box(acc.wrapping_mul(31).wrapping_add(u64::from(i)));
        }
        black_box(acc);
        start.elapsed().as_secs_f64() * 1000.0
    }
}
