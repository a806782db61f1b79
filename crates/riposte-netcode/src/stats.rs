//! Netcode telemetry
//!
//! Derived, non-authoritative numbers for display and for the anomaly
//! monitor. Nothing here feeds back into the simulation.

use crate::transport::{ConnectionState, LinkStats};
use riposte_core::Frame;
use serde::{Deserialize, Serialize};

/// Point-in-time netcode statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NetStats {
    /// Latest round-trip time in milliseconds
    pub rtt_ms: Option<f64>,
    /// Smoothed round-trip variation in milliseconds
    pub jitter_ms: f64,
    /// Frames of local input buffering
    pub input_delay: Frame,
    /// Rollbacks performed
    pub rollbacks: u64,
    /// Frames resimulated across all rollbacks
    pub rollback_frames: u64,
    /// Rollbacks that could not be performed (snapshot gone)
    pub unrecoverable_desyncs: u64,
    /// Next frame to be simulated
    pub current_frame: Frame,
    /// Last frame of the contiguous confirmed remote prefix
    pub last_confirmed_frame: Option<Frame>,
    /// Simulated frames not yet backed by confirmed remote input
    pub prediction_gap: Frame,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub out_of_order: u64,
    pub loss_suspect: u64,
    pub connection: ConnectionState,
    pub reconnect_attempts: u32,
}

impl NetStats {
    /// Fold transport telemetry into these stats
    pub fn with_link(mut self, link: &LinkStats) -> Self {
        self.rtt_ms = link.rtt_ms;
        self.jitter_ms = link.jitter_ms;
        self.bytes_sent = link.bytes_sent;
        self.bytes_received = link.bytes_received;
        self.out_of_order = link.out_of_order;
        self.loss_suspect = link.loss_suspect;
        self.connection = link.state;
        self.reconnect_attempts = link.reconnect_attempts;
        self
    }

    /// Coarse connection quality for the HUD
    pub fn quality_grade(&self) -> QualityGrade {
        if self.connection != ConnectionState::Open {
            return QualityGrade::Poor;
        }
        let Some(rtt) = self.rtt_ms else {
            return QualityGrade::Unknown;
        };
        match (rtt, self.jitter_ms) {
            (rtt, jitter) if rtt < 60.0 && jitter < 10.0 => QualityGrade::Excellent,
            (rtt, jitter) if rtt < 120.0 && jitter < 20.0 => QualityGrade::Good,
            (rtt, jitter) if rtt < 200.0 && jitter < 40.0 => QualityGrade::Fair,
            _ => QualityGrade::Poor,
        }
    }
}

/// Connection quality bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    /// No round trip measured yet
    Unknown,
    Excellent,
    Good,
    Fair,
    Poor,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_with(rtt: f64, jitter: f64) -> NetStats {
        NetStats {
            rtt_ms: Some(rtt),
            jitter_ms: jitter,
            connection: ConnectionState::Open,
            ..Default::default()
        }
    }

    #[test]
    fn test_quality_grades() {
        assert_eq!(open_with(30.0, 2.0).quality_grade(), QualityGrade::Excellent);
        assert_eq!(open_with(90.0, 5.0).quality_grade(), QualityGrade::Good);
        assert_eq!(open_with(30.0, 35.0).quality_grade(), QualityGrade::Fair);
        assert_eq!(open_with(250.0, 1.0).quality_grade(), QualityGrade::Poor);
    }

    #[test]
    fn test_unknown_until_measured() {
        let stats = NetStats {
            connection: ConnectionState::Open,
            ..Default::default()
        };
        assert_eq!(stats.quality_grade(), QualityGrade::Unknown);
    }

    #[test]
    fn test_not_open_is_poor() {
        let stats = NetStats {
            connection: ConnectionState::Reconnecting,
            ..open_with(20.0, 1.0)
        };
        assert_eq!(stats.quality_grade(), QualityGrade::Poor);
    }

    #[test]
    fn test_with_link_copies_counters() {
        let link = LinkStats {
            rtt_ms: Some(42.0),
            jitter_ms: 3.0,
            bytes_sent: 100,
            bytes_received: 90,
            out_of_order: 2,
            loss_suspect: 1,
            state: ConnectionState::Open,
            reconnect_attempts: 1,
        };
        let stats = NetStats::default().with_link(&link);
        assert_eq!(stats.rtt_ms, Some(42.0));
        assert_eq!(stats.loss_suspect, 1);
        assert_eq!(stats.connection, ConnectionState::Open);
    }
}
