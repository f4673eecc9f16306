//! # History Timeline
//!
//! Fixed-capacity history of deviation samples, replayed as a trace that
//! scrolls at a constant speed in pixels per second.
//!
//! Samples arrive once per audio buffer, and buffers do not arrive at a
//! steady rate. Every sample is therefore stamped on arrival and the trace
//! spaces points by the measured time between them, not by a nominal period.
//!
//! Timestamps come from a [`Clock`] so tests can drive time by hand.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Number of samples kept (90 s of history at 10 buffers per second).
pub const HISTORY_CAPACITY: usize = 900;

/// Horizontal position reported for buffers without a tone.
///
/// Lies outside `0..=width`, so a gap is never confused with a centred reading.
pub const GAP_X: f32 = -1.0;

/// Source of monotonic timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One buffer's deviation, or `None` when no tone was detected.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DeviationSample {
    value: Option<f32>,
    timestamp: Instant,
}

/// A point of the rendered trace. `y` grows into the past.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub x: f32,
    pub y: f32,
}

impl TracePoint {
    pub fn is_gap(&self) -> bool {
        self.x == GAP_X
    }
}

/// Circular buffer of [`DeviationSample`]s.
pub struct HistoryTimeline {
    samples: Vec<DeviationSample>,
    capacity: usize,
    sample_counter: u64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for HistoryTimeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryTimeline")
            .field("len", &self.samples.len())
            .field("capacity", &self.capacity)
            .field("sample_counter", &self.sample_counter)
            .finish()
    }
}

impl HistoryTimeline {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            sample_counter: 0,
            clock,
        }
    }

    /// Slot the next sample is written to.
    fn cursor(&self) -> usize {
        (self.sample_counter % self.capacity as u64) as usize
    }

    /// Records a deviation (or its absence) stamped with the current time.
    /// The oldest sample is overwritten once the buffer is full.
    pub fn append(&mut self, value: Option<f32>) {
        let sample = DeviationSample {
            value,
            timestamp: self.clock.now(),
        };
        let idx = self.cursor();
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[idx] = sample;
        }
        self.sample_counter += 1;
    }

    /// Number of valid samples, at most the capacity.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sample_counter = 0;
    }

    /// Walks the history from newest to oldest.
    ///
    /// `x = (1 + value) * width / 2` spans the width for values in [-1, 1];
    /// missing values are placed at [`GAP_X`]. The newest point has `y = 0`
    /// and each older point sits `pixels_per_second * dt` further down, where
    /// `dt` is the measured gap between the two samples.
    pub fn render_points(
        &self,
        pixels_per_second: f32,
        width: f32,
    ) -> impl Iterator<Item = TracePoint> + '_ {
        let newest = self.cursor() + self.capacity - 1;
        let mut newer_timestamp: Option<Instant> = None;
        let mut y = 0.0f32;

        (0..self.samples.len()).map(move |i| {
            let sample = &self.samples[(newest - i) % self.capacity];
            if let Some(newer) = newer_timestamp {
                let dt = newer.saturating_duration_since(sample.timestamp);
                y += pixels_per_second * dt.as_secs_f32();
            }
            newer_timestamp = Some(sample.timestamp);

            let x = match sample.value {
                Some(v) if v.is_finite() => (1.0 + v.clamp(-1.0, 1.0)) * width / 2.0,
                _ => GAP_X,
            };
            TracePoint { x, y }
        })
    }

    /// Collects [`render_points`](Self::render_points) into an immutable
    /// snapshot that can be handed to another thread.
    pub fn snapshot(&self, pixels_per_second: f32, width: f32) -> Arc<[TracePoint]> {
        self.render_points(pixels_per_second, width).collect()
    }
}
