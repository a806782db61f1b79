//! Riposte Rollback Buffer - Frame-indexed ring buffers for rollback
//!
//! This crate provides bounded, memory-efficient histories for real-time
//! rollback netcode.
//!
//! # Features
//!
//! - **Bounded memory**: Fixed-size rings, no unbounded growth over long
//!   or reconnecting sessions
//! - **O(1) insertion and lookup**: A frame lives in slot `frame % capacity`
//! - **Automatic eviction**: Writing frame `f` overwrites `f - capacity`
//!
//! # Example
//!
//! ```rust
//! use riposte_core::SnapshotHistory;
//! use riposte_rollback_buffer::RollbackBuffer;
//!
//! // Keep the last 8 frames of snapshots
//! let mut buffer: RollbackBuffer<Vec<u8>> = RollbackBuffer::new(8);
//!
//! buffer.save_state(0, vec![0]);
//! buffer.save_state(1, vec![1]);
//!
//! assert_eq!(buffer.get_state(1), Some(&vec![1]));
//!
//! // Frame 9 shares a slot with frame 1 and evicts it
//! buffer.save_state(9, vec![9]);
//! assert!(buffer.get_state(1).is_none());
//! ```

mod frame_ring;

pub use frame_ring::FrameRing;

use riposte_core::{Frame, SnapshotHistory};

/// A ring buffer of simulation snapshots
///
/// The capacity is the rollback depth: a snapshot older than `capacity`
/// frames behind the newest one has been overwritten and cannot be
/// restored.
#[derive(Debug)]
pub struct RollbackBuffer<S> {
    states: FrameRing<S>,
}

impl<S> RollbackBuffer<S> {
    /// Ring sized for `depth` frames of rollback.
    ///
    /// Panics if `depth` is zero.
    pub fn new(depth: usize) -> Self {
        Self {
            states: FrameRing::new(depth),
        }
    }

    /// Frames a rollback can currently reach, or `None` when nothing is held
    pub fn window(&self) -> Option<RollbackWindow> {
        let (earliest, latest) = self.states.frame_range()?;
        Some(RollbackWindow {
            earliest,
            latest,
            depth: self.states.capacity(),
        })
    }
}

impl<S> SnapshotHistory<S> for RollbackBuffer<S> {
    fn save_state(&mut self, frame: Frame, snapshot: S) {
        self.states.insert(frame, snapshot);
    }

    fn get_state(&self, frame: Frame) -> Option<&S> {
        self.states.get(frame)
    }

    fn clear_before(&mut self, frame: Frame) {
        self.states.clear_before(frame);
    }

    fn clear(&mut self) {
        self.states.clear();
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.states.capacity())
    }

    fn len(&self) -> usize {
        self.states.len()
    }

    fn frame_range(&self) -> Option<(Frame, Frame)> {
        self.states.frame_range()
    }
}

impl<S> Default for RollbackBuffer<S> {
    fn default() -> Self {
        // 8 frames at 60fps, about 133ms of speculation
        Self::new(8)
    }
}

/// Span of restorable frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackWindow {
    pub earliest: Frame,
    pub latest: Frame,
    /// Ring capacity; `latest - earliest` never reaches it
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_has_no_window() {
        let snapshots: RollbackBuffer<u32> = RollbackBuffer::new(6);
        assert_eq!(snapshots.capacity(), Some(6));
        assert!(snapshots.is_empty());
        assert!(snapshots.window().is_none());
    }

    #[test]
    fn test_restore_recent_frames() {
        let mut snapshots = RollbackBuffer::new(6);
        for frame in 100..103 {
            snapshots.save_state(frame, frame * 2);
        }

        assert_eq!(snapshots.get_state(101), Some(&202));
        assert!(snapshots.get_state(103).is_none());
        assert!(snapshots.get_state(99).is_none());
    }

    #[test]
    fn test_snapshots_beyond_depth_are_evicted() {
        let mut snapshots = RollbackBuffer::new(3);
        for frame in 0..7 {
            snapshots.save_state(frame, format!("state-{frame}"));
        }

        assert_eq!(
            snapshots.window(),
            Some(RollbackWindow {
                earliest: 4,
                latest: 6,
                depth: 3
            })
        );
        assert!(snapshots.get_state(3).is_none());
        assert_eq!(snapshots.get_state(4).map(String::as_str), Some("state-4"));
    }

    #[test]
    fn test_resimulated_frame_replaces_snapshot() {
        let mut snapshots = RollbackBuffer::new(4);
        snapshots.save_state(7, 'a');
        snapshots.save_state(7, 'b');

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots.get_state(7), Some(&'b'));
    }

    #[test]
    fn test_prune_below_confirmed_frame() {
        let mut snapshots = RollbackBuffer::new(16);
        for frame in [3, 5, 9] {
            snapshots.save_state(frame, ());
        }

        snapshots.clear_before(5);
        assert!(snapshots.get_state(3).is_none());
        assert!(snapshots.get_state(5).is_some());
        assert_eq!(snapshots.window().map(|w| w.earliest), Some(5));

        // Everything confirmed: nothing left to roll back to
        snapshots.clear_before(10);
        assert!(snapshots.window().is_none());
    }

    #[test]
    fn test_clear_for_rematch() {
        let mut snapshots = RollbackBuffer::new(4);
        snapshots.save_state(1, 1u8);
        snapshots.save_state(2, 2u8);
        snapshots.clear();

        assert_eq!(snapshots.len(), 0);
        assert!(snapshots.window().is_none());
    }
}
