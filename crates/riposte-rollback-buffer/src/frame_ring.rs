//! Generic frame-indexed ring
//!
//! Every per-frame history in riposte (inputs, checksums, snapshots) lives
//! in one of these. A value for frame `f` sits in slot `f % capacity` and is
//! tagged with its frame, so a lookup for an overwritten frame misses
//! instead of returning a stale value.

use riposte_core::Frame;

/// Fixed-capacity storage indexed by `frame mod capacity`
#[derive(Debug, Clone)]
pub struct FrameRing<T> {
    slots: Vec<Option<(Frame, T)>>,
    len: usize,
}

impl<T> FrameRing<T> {
    /// Create a ring holding at most `capacity` frames
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    fn index(&self, frame: Frame) -> usize {
        frame as usize % self.slots.len()
    }

    /// Store a value for `frame`
    ///
    /// Returns the entry that previously occupied the slot, whether it was
    /// an older frame being evicted or the same frame being replaced.
    pub fn insert(&mut self, frame: Frame, value: T) -> Option<(Frame, T)> {
        let index = self.index(frame);
        let previous = self.slots[index].replace((frame, value));
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Get the value stored for exactly `frame`
    pub fn get(&self, frame: Frame) -> Option<&T> {
        self.slots[self.index(frame)]
            .as_ref()
            .filter(|(f, _)| *f == frame)
            .map(|(_, v)| v)
    }

    /// Remove every entry older than `frame`
    pub fn clear_before(&mut self, frame: Frame) {
        for slot in &mut self.slots {
            if matches!(slot, Some((f, _)) if *f < frame) {
                *slot = None;
                self.len -= 1;
            }
        }
    }

    /// Remove everything
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Oldest and newest frame currently held
    pub fn frame_range(&self) -> Option<(Frame, Frame)> {
        let mut frames = self.slots.iter().flatten().map(|(f, _)| *f);
        let first = frames.next()?;
        Some(frames.fold((first, first), |(lo, hi), f| (lo.min(f), hi.max(f))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_evicts_same_slot() {
        let mut ring = FrameRing::new(4);
        assert!(ring.insert(1, "a").is_none());
        let evicted = ring.insert(5, "b");

        assert_eq!(evicted, Some((1, "a")));
        assert_eq!(ring.len(), 1);
        assert!(ring.get(1).is_none());
        assert_eq!(ring.get(5), Some(&"b"));
    }

    #[test]
    fn test_replace_same_frame() {
        let mut ring = FrameRing::new(4);
        ring.insert(2, 10);
        assert_eq!(ring.insert(2, 20), Some((2, 10)));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(2), Some(&20));
    }

    #[test]
    fn test_clear_before_and_range() {
        let mut ring = FrameRing::new(8);
        for f in 10..16 {
            ring.insert(f, f * 2);
        }
        assert_eq!(ring.frame_range(), Some((10, 15)));

        ring.clear_before(13);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.frame_range(), Some((13, 15)));

        assert!(ring.get(12).is_none());
        assert_eq!(ring.get(13), Some(&26));
    }
}
