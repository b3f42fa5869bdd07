//! Sequence number arithmetic for loss detection
//!
//! Readings carry a `u16` sequence that wraps from 65535 back to 0. A
//! receiver must compare sequences modulo 2^16: the step 65535 → 0 is an
//! ordinary increment, not a gap of -65535.
//!
//! The signed wrapping delta gives the right answer as long as consecutive
//! observations are less than 32768 readings apart:
//!
//! ```text
//! prev   next   delta   meaning
//! 41     42       1     in order
//! 65535  0        1     in order (wrap)
//! 41     45       4     3 readings lost
//! 42     42       0     duplicate
//! 45     43      -2     reordered / late
//! ```
//!
//! A late reading only counts as recovered if it was actually missing. A
//! second copy of a late reading is a duplicate and leaves `lost` alone.

use std::collections::BTreeSet;

use serde::Serialize;

/// Signed distance from `prev` to `next`, modulo 2^16
pub fn sequence_delta(prev: u16, next: u16) -> i16 {
    next.wrapping_sub(prev) as i16
}

/// Classification of one observed sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequenceGap {
    /// First sequence seen
    First,
    /// Exactly one after the previous
    InOrder,
    /// This many readings were skipped
    Lost(u16),
    /// Already seen, or older than any reading still missing
    Duplicate,
    /// A missing reading that arrived late
    Reordered,
}

/// Receiver-side tracker of a reading stream
#[derive(Debug, Clone, Default, Serialize)]
pub struct SequenceTracker {
    last: Option<u16>,
    /// Skipped sequences not yet seen, within half the sequence space of `last`
    #[serde(skip)]
    missing: BTreeSet<u16>,
    /// Readings observed, duplicates included
    pub received: u64,
    /// Skipped readings that have not arrived since
    pub lost: u64,
    /// Late or repeated readings
    pub reordered: u64,
}

impl SequenceTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest sequence accepted so far
    pub fn last(&self) -> Option<u16> {
        self.last
    }

    /// Record `sequence` and classify it against the previous one
    pub fn observe(&mut self, sequence: u16) -> SequenceGap {
        self.received += 1;

        let Some(prev) = self.last else {
            self.last = Some(sequence);
            return SequenceGap::First;
        };

        match sequence_delta(prev, sequence) {
            1 => {
                self.advance_to(sequence);
                SequenceGap::InOrder
            }
            0 => {
                self.reordered += 1;
                SequenceGap::Duplicate
            }
            d if d > 1 => {
                let skipped = (d - 1) as u16;
                self.lost += u64::from(skipped);
                for offset in 1..=skipped {
                    self.missing.insert(prev.wrapping_add(offset));
                }
                self.advance_to(sequence);
                SequenceGap::Lost(skipped)
            }
            _ => {
                self.reordered += 1;
                if self.missing.remove(&sequence) {
                    // Counted as lost when the newer reading arrived
                    self.lost = self.lost.saturating_sub(1);
                    SequenceGap::Reordered
                } else {
                    SequenceGap::Duplicate
                }
            }
        }
    }

    /// Move `last` forward and forget gaps that are no longer behind it
    fn advance_to(&mut self, sequence: u16) {
        self.last = Some(sequence);
        if !self.missing.is_empty() {
            self.missing.retain(|&m| sequence_delta(m, sequence) > 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wraparound_is_in_order() {
        assert_eq!(sequence_delta(65535, 0), 1);

        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.observe(65534), SequenceGap::First);
        assert_eq!(tracker.observe(65535), SequenceGap::InOrder);
        assert_eq!(tracker.observe(0), SequenceGap::InOrder);
        assert_eq!(tracker.lost, 0);
    }

    #[test]
    fn classifies_gaps() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(41);
        assert_eq!(tracker.observe(45), SequenceGap::Lost(3));
        assert_eq!(tracker.observe(45), SequenceGap::Duplicate);
        assert_eq!(tracker.observe(43), SequenceGap::Reordered);
        assert_eq!(tracker.lost, 2);
        assert_eq!(tracker.reordered, 2);
        assert_eq!(tracker.received, 4);
        assert_eq!(tracker.last(), Some(45));
    }

    #[test]
    fn repeated_late_reading_is_a_duplicate() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(1);
        assert_eq!(tracker.observe(5), SequenceGap::Lost(3));
        assert_eq!(tracker.observe(2), SequenceGap::Reordered);
        assert_eq!(tracker.lost, 2);

        // 3 and 4 are still missing
        assert_eq!(tracker.observe(2), SequenceGap::Duplicate);
        assert_eq!(tracker.lost, 2);
        assert_eq!(tracker.observe(0), SequenceGap::Duplicate);
        assert_eq!(tracker.lost, 2);

        assert_eq!(tracker.observe(4), SequenceGap::Reordered);
        assert_eq!(tracker.lost, 1);
        assert_eq!(tracker.last(), Some(5));
    }

    #[test]
    fn late_reading_across_wrap_is_recovered() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(65534);
        assert_eq!(tracker.observe(1), SequenceGap::Lost(2));
        assert_eq!(tracker.observe(65535), SequenceGap::Reordered);
        assert_eq!(tracker.observe(0), SequenceGap::Reordered);
        assert_eq!(tracker.lost, 0);
    }

    #[test]
    fn loss_across_wrap() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(65530);
        assert_eq!(tracker.observe(2), SequenceGap::Lost(7));
    }

    proptest! {
        #[test]
        fn successor_is_always_in_order(start in any::<u16>()) {
            prop_assert_eq!(sequence_delta(start, start.wrapping_add(1)), 1);
        }

        #[test]
        fn small_forward_jumps_count_losses(start in any::<u16>(), skip in 1u16..1000) {
            let mut tracker = SequenceTracker::new();
            tracker.observe(start);
            let gap = tracker.observe(start.wrapping_add(skip + 1));
            prop_assert_eq!(gap, SequenceGap::Lost(skip));
        }
    }
}
