//! # String Stabilizer
//!
//! Debounces the per-buffer target so a single mis-detected buffer cannot
//! flip the note on screen. Raw targets are queued and the displayed target
//! only moves when the most recent entries agree unanimously.

use crate::instrument::InstrumentTarget;
use std::collections::VecDeque;

/// Number of raw targets kept in the vote queue.
pub const VOTE_QUEUE_CAPACITY: usize = 20;
/// Number of most recent entries that must agree.
pub const VOTE_WINDOW: usize = 3;

/// Vote filter turning raw targets into a stable displayed target.
#[derive(Debug, Clone)]
pub struct StringStabilizer {
    queue: VecDeque<Option<InstrumentTarget>>,
    capacity: usize,
    window: usize,
    displayed: Option<InstrumentTarget>,
}

impl Default for StringStabilizer {
    fn default() -> Self {
        Self::new(VOTE_QUEUE_CAPACITY, VOTE_WINDOW)
    }
}

impl StringStabilizer {
    /// Creates a stabilizer; `window` is clamped to `3..=capacity`.
    pub fn new(capacity: usize, window: usize) -> Self {
        let capacity = capacity.max(VOTE_WINDOW);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            window: window.clamp(VOTE_WINDOW, capacity),
            displayed: None,
        }
    }

    /// Pushes a raw target and returns the displayed target afterwards.
    ///
    /// The displayed target is replaced by `raw` only when the last
    /// `window` entries all denote the same note. Otherwise, including on
    /// silence, the previous value is kept.
    pub fn vote(&mut self, raw: Option<InstrumentTarget>) -> Option<&InstrumentTarget> {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(raw);

        if self.is_unanimous() {
            self.displayed = raw;
        }
        self.displayed.as_ref()
    }

    fn is_unanimous(&self) -> bool {
        if self.queue.len() < self.window {
            return false;
        }
        let mut recent = self.queue.iter().rev().take(self.window);
        let Some(Some(newest)) = recent.next() else {
            return false;
        };
        recent.all(|entry| entry.is_some_and(|t| t.same_note(newest)))
    }

    pub fn displayed(&self) -> Option<&InstrumentTarget> {
        self.displayed.as_ref()
    }

    /// Number of queued raw targets.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Forgets all votes and the displayed target.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.displayed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::{Note, NoteName};

    fn target(name: NoteName, octave: i32, frequency: f32) -> Option<InstrumentTarget> {
        Some(InstrumentTarget {
            note: Note::new(name, octave),
            frequency,
        })
    }

    #[test]
    fn three_in_a_row_is_displayed() {
        let mut s = StringStabilizer::default();
        let a = target(NoteName::A, 2, 110.0);
        s.vote(a);
        assert_eq!(s.displayed(), None);
        s.vote(a);
        assert_eq!(s.displayed(), None);
        assert_eq!(s.vote(a), a.as_ref());
    }

    #[test]
    fn interrupted_run_keeps_previous() {
        let mut s = StringStabilizer::default();
        let e = target(NoteName::E, 2, 82.41);
        let a = target(NoteName::A, 2, 110.0);
        let b = target(NoteName::B, 3, 246.94);
        for _ in 0..3 {
            s.vote(e);
        }
        s.vote(a);
        s.vote(b);
        s.vote(a);
        assert_eq!(s.displayed(), e.as_ref());
    }

    #[test]
    fn silence_never_clears_display() {
        let mut s = StringStabilizer::default();
        let d = target(NoteName::D, 3, 146.83);
        for _ in 0..3 {
            s.vote(d);
        }
        for _ in 0..10 {
            s.vote(None);
        }
        assert_eq!(s.displayed(), d.as_ref());
    }

    #[test]
    fn equality_is_by_note_not_frequency() {
        let mut s = StringStabilizer::default();
        s.vote(target(NoteName::G, 3, 196.0));
        s.vote(target(NoteName::G, 3, 196.0));
        s.vote(target(NoteName::G, 4, 392.0));
        assert_eq!(s.displayed(), None);
    }

    #[test]
    fn queue_is_bounded() {
        let mut s = StringStabilizer::default();
        for _ in 0..100 {
            s.vote(None);
        }
        assert_eq!(s.len(), VOTE_QUEUE_CAPACITY);
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = StringStabilizer::default();
        let a = target(NoteName::A, 2, 110.0);
        for _ in 0..3 {
            s.vote(a);
        }
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.displayed(), None);
    }
}
