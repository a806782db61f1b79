//! Link quality tracking
//!
//! Round-trip time comes from heartbeat echoes. Jitter is an exponential
//! moving average of the change between consecutive RTT samples:
//!
//! ```text
//! jitter += (|rtt - last_rtt| - jitter) * smoothing
//! ```
//!
//! The first sample has nothing to compare against and only sets the
//! baseline. Ordering and loss are guessed from the frame numbers of
//! received inputs; neither counter is exact, since redundant re-sends and
//! reconnections both look like reordering.

use riposte_core::Frame;

/// RTT, jitter, ordering and byte counters for one link
#[derive(Debug, Clone)]
pub struct LinkQuality {
    smoothing: f64,
    last_rtt: Option<f64>,
    jitter: f64,
    last_frame: Option<Frame>,
    out_of_order: u64,
    loss_suspect: u64,
    bytes_sent: u64,
    bytes_received: u64,
}

impl LinkQuality {
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing,
            last_rtt: None,
            jitter: 0.0,
            last_frame: None,
            out_of_order: 0,
            loss_suspect: 0,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Fold in one round-trip measurement
    pub fn record_rtt(&mut self, rtt_ms: f64) {
        if let Some(last) = self.last_rtt {
            self.jitter += ((rtt_ms - last).abs() - self.jitter) * self.smoothing;
        }
        self.last_rtt = Some(rtt_ms);
    }

    /// Note the frame number of a received input
    pub fn record_frame(&mut self, frame: Frame) {
        match self.last_frame {
            None => self.last_frame = Some(frame),
            Some(last) if frame <= last => self.out_of_order += 1,
            Some(last) => {
                self.loss_suspect += u64::from(frame - last - 1);
                self.last_frame = Some(frame);
            }
        }
    }

    pub fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }

    /// Latest round-trip time in milliseconds
    pub fn rtt(&self) -> Option<f64> {
        self.last_rtt
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    pub fn loss_suspect(&self) -> u64 {
        self.loss_suspect
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

impl Default for LinkQuality {
    fn default() -> Self {
        Self::new(0.25)
    }
}
