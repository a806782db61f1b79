//! Where a rollback engine keeps the state it may need to rewind to
//!
//! The netcode session saves one snapshot per simulated frame and asks for
//! it back when a late remote input invalidates a prediction. The bounded
//! ring in `riposte-rollback-buffer` is the implementation used in play;
//! anything that answers "what did the world look like before frame `f`"
//! can stand in for it.

use crate::Frame;

/// Frame-keyed snapshot store consulted on rollback
///
/// A miss from [`get_state`](SnapshotHistory::get_state) ends the match,
/// so bounded stores should say how far back they reach through
/// [`capacity`](SnapshotHistory::capacity).
pub trait SnapshotHistory<S> {
    /// Record the state taken just before `frame` was stepped.
    /// Resimulating a frame replaces its earlier snapshot.
    fn save_state(&mut self, frame: Frame, snapshot: S);

    fn get_state(&self, frame: Frame) -> Option<&S>;

    /// Forget snapshots older than `frame`; nothing before it can be rolled back to.
    fn clear_before(&mut self, frame: Frame);

    fn clear(&mut self);

    /// Deepest rollback supported, `None` if unbounded
    fn capacity(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Earliest and latest restorable frames
    fn frame_range(&self) -> Option<(Frame, Frame)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Unbounded store, handy as a reference when checking replays
    #[derive(Default)]
    struct Archive(BTreeMap<Frame, u64>);

    impl SnapshotHistory<u64> for Archive {
        fn save_state(&mut self, frame: Frame, snapshot: u64) {
            self.0.insert(frame, snapshot);
        }

        fn get_state(&self, frame: Frame) -> Option<&u64> {
            self.0.get(&frame)
        }

        fn clear_before(&mut self, frame: Frame) {
            self.0 = self.0.split_off(&frame);
        }

        fn clear(&mut self) {
            self.0.clear();
        }

        fn capacity(&self) -> Option<usize> {
            None
        }

        fn len(&self) -> usize {
            self.0.len()
        }

        fn frame_range(&self) -> Option<(Frame, Frame)> {
            let (&earliest, _) = self.0.first_key_value()?;
            let (&latest, _) = self.0.last_key_value()?;
            Some((earliest, latest))
        }
    }

    #[test]
    fn test_is_empty_follows_len() {
        let mut archive = Archive::default();
        assert!(archive.is_empty());
        assert_eq!(archive.frame_range(), None);

        archive.save_state(12, 0xfeed);
        assert!(!archive.is_empty());
        assert_eq!(archive.frame_range(), Some((12, 12)));
    }

    #[test]
    fn test_resimulation_replaces_snapshot() {
        let mut archive = Archive::default();
        archive.save_state(40, 7);
        archive.save_state(41, 8);
        archive.save_state(40, 9);

        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get_state(40), Some(&9));
    }

    #[test]
    fn test_clear_before_keeps_boundary() {
        let mut archive = Archive::default();
        for frame in 0..6 {
            archive.save_state(frame, u64::from(frame));
        }
        archive.clear_before(4);

        assert_eq!(archive.frame_range(), Some((4, 5)));
        assert_eq!(archive.get_state(3), None);
        assert_eq!(archive.capacity(), None);
    }
}
