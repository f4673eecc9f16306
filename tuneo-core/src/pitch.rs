//! # Pitch Detection Module
//!
//! The fundamental-frequency estimator that feeds the tuner. The rest of
//! the crate only sees the [`PitchEstimator`] trait; [`YinEstimator`] is the
//! implementation used for live input.
//!
//! ## Features
//! - YIN pitch detection restricted to a search range
//! - Adaptive range narrowing around the previous pitch while a note decays
//! - Silence gate on RMS level
//! - Parabolic interpolation for sub-sample accuracy
//! - Optional spectrum refinement

use crate::fft;

/// Lowest frequency searched by default, in Hz.
pub const MIN_FREQ: f32 = 30.0;
/// Highest frequency searched by default, in Hz.
pub const MAX_FREQ: f32 = 500.0;
/// Relative half-width of the narrowed range around the previous pitch.
pub const PITCH_NARROW_RANGE: f32 = 0.1;

/// Value reported when no tone is present.
pub const NO_PITCH: f32 = -1.0;

/// One pitch estimate per audio buffer.
///
/// Carries no timestamp: the history timeline stamps each sample through
/// its own [`Clock`](crate::timeline::Clock).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchSample {
    /// Estimated frequency in Hz; zero or negative means "no tone"
    pub frequency: f32,
    pub sample_rate: u32,
}

/// Frequency band the estimator is allowed to report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRange {
    pub min_freq: f32,
    pub max_freq: f32,
}

impl Default for SearchRange {
    fn default() -> Self {
        Self {
            min_freq: MIN_FREQ,
            max_freq: MAX_FREQ,
        }
    }
}

impl SearchRange {
    /// Narrows the range to ±10 % of `prev_pitch` while the signal energy is
    /// falling, which keeps a decaying string from jumping an octave.
    /// Any other case searches the full default range.
    pub fn adaptive(prev_pitch: f32, rms_decreasing: bool) -> Self {
        if prev_pitch > 0.0 && prev_pitch.is_finite() && rms_decreasing {
            Self {
                min_freq: prev_pitch * (1.0 - PITCH_NARROW_RANGE),
                max_freq: prev_pitch * (1.0 + PITCH_NARROW_RANGE),
            }
        } else {
            Self::default()
        }
    }
}

/// Root mean square level of a buffer, 0 for an empty one.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// A fundamental-frequency estimator.
pub trait PitchEstimator: Send {
    /// Estimates the pitch of `samples`.
    ///
    /// # Returns
    /// * frequency in Hz within `range`, or [`NO_PITCH`]
    fn estimate(&mut self, samples: &[f32], sample_rate: u32, range: SearchRange) -> f32;
}

/// YIN estimator with a silence gate.
#[derive(Debug, Clone)]
pub struct YinEstimator {
    /// Absolute threshold on the normalised difference function
    threshold: f32,
    /// Minimum RMS level for pitch detection
    amplitude_threshold: f32,
    refine: bool,
    yin_buffer: Vec<f32>,
}

impl Default for YinEstimator {
    fn default() -> Self {
        Self::new(0.15, 0.01)
    }
}

impl YinEstimator {
    pub fn new(threshold: f32, amplitude_threshold: f32) -> Self {
        Self {
            threshold,
            amplitude_threshold,
            refine: false,
            yin_buffer: Vec::new(),
        }
    }

    /// Refine each estimate against the magnitude spectrum.
    pub fn with_spectral_refinement(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    fn detect(&mut self, signal: &[f32], sample_rate: u32, range: SearchRange) -> Option<f32> {
        let half = signal.len() / 2;
        let valid_range = range.min_freq > 0.0 && range.max_freq > range.min_freq;
        if half < 3 || sample_rate == 0 || !valid_range {
            return None;
        }

        // --- Noise Gate ---
        if rms(signal) < self.amplitude_threshold {
            return None;
        }

        let sr = sample_rate as f32;
        let tau_min = ((sr / range.max_freq).floor() as usize).max(2);
        let tau_max = ((sr / range.min_freq).ceil() as usize).min(half - 2);
        if tau_min >= tau_max {
            return None;
        }

        // --- Difference function over a window of half the buffer ---
        self.yin_buffer.clear();
        self.yin_buffer.resize(tau_max + 2, 0.0);
        for tau in 1..tau_max + 2 {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            self.yin_buffer[tau] = diff;
        }

        // --- Cumulative mean normalized difference ---
        self.yin_buffer[0] = 1.0;
        let mut running_sum = 0.0;
        for tau in 1..self.yin_buffer.len() {
            running_sum += self.yin_buffer[tau];
            if running_sum != 0.0 {
                self.yin_buffer[tau] *= tau as f32 / running_sum;
            } else {
                self.yin_buffer[tau] = 1.0;
            }
        }

        // --- First dip under the threshold, then down to its local minimum ---
        let mut period = (tau_min..=tau_max).find(|&tau| self.yin_buffer[tau] < self.threshold)?;
        while period < tau_max && self.yin_buffer[period + 1] < self.yin_buffer[period] {
            period += 1;
        }

        // --- Parabolic interpolation ---
        let y1 = self.yin_buffer[period - 1];
        let y2 = self.yin_buffer[period];
        let y3 = self.yin_buffer[period + 1];
        let curvature = y1 - 2.0 * y2 + y3;
        let period_float = if curvature != 0.0 {
            period as f32 + (y1 - y3) / (2.0 * curvature)
        } else {
            period as f32
        };

        let frequency = sr / period_float;
        if frequency.is_finite() && frequency > 0.0 {
            Some(frequency)
        } else {
            None
        }
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&mut self, samples: &[f32], sample_rate: u32, range: SearchRange) -> f32 {
        let Some(rough) = self.detect(samples, sample_rate, range) else {
            return NO_PITCH;
        };
        if !self.refine {
            return rough;
        }
        let magnitudes = fft::magnitude_spectrum(samples);
        fft::refine_from_spectrum(&magnitudes, samples.len(), rough, sample_rate).unwrap_or(rough)
    }
}

/// Runs an estimator buffer after buffer, carrying the state the adaptive
/// search range needs: the previous pitch and the previous RMS level.
pub struct PitchTracker {
    estimator: Box<dyn PitchEstimator>,
    prev_pitch: f32,
    prev_rms: f32,
}

impl PitchTracker {
    pub fn new(estimator: Box<dyn PitchEstimator>) -> Self {
        Self {
            estimator,
            prev_pitch: NO_PITCH,
            prev_rms: 0.0,
        }
    }

    /// Estimates the pitch of the next buffer.
    pub fn track(&mut self, samples: &[f32], sample_rate: u32) -> PitchSample {
        let level = rms(samples);
        let rms_decreasing = level < self.prev_rms;
        self.prev_rms = level;

        let range = SearchRange::adaptive(self.prev_pitch, rms_decreasing);
        let frequency = self.estimator.estimate(samples, sample_rate, range);
        self.prev_pitch = frequency;

        PitchSample {
            frequency,
            sample_rate,
        }
    }

    /// Forgets the previous pitch and level.
    pub fn reset(&mut self) {
        self.prev_pitch = NO_PITCH;
        self.prev_rms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn detects_guitar_strings() {
        let mut yin = YinEstimator::default();
        for freq in [82.41, 110.0, 146.83, 196.0, 246.94, 329.63] {
            let signal = sine(freq, 44100, 4096, 0.5);
            let detected = yin.estimate(&signal, 44100, SearchRange::default());
            assert!(
                (detected - freq).abs() / freq < 0.01,
                "expected {freq}, got {detected}"
            );
        }
    }

    #[test]
    fn silence_has_no_pitch() {
        let mut yin = YinEstimator::default();
        assert_eq!(yin.estimate(&[0.0; 4096], 44100, SearchRange::default()), NO_PITCH);
        let quiet = sine(110.0, 44100, 4096, 0.001);
        assert_eq!(yin.estimate(&quiet, 44100, SearchRange::default()), NO_PITCH);
    }

    #[test]
    fn degenerate_inputs() {
        let mut yin = YinEstimator::default();
        assert_eq!(yin.estimate(&[], 44100, SearchRange::default()), NO_PITCH);
        assert_eq!(yin.estimate(&[0.5; 4], 44100, SearchRange::default()), NO_PITCH);
        let signal = sine(110.0, 44100, 4096, 0.5);
        assert_eq!(yin.estimate(&signal, 0, SearchRange::default()), NO_PITCH);
    }

    #[test]
    fn narrowed_range_rejects_distant_pitch() {
        let mut yin = YinEstimator::default();
        let signal = sine(150.0, 44100, 4096, 0.5);
        let narrow = SearchRange::adaptive(110.0, true);
        assert_eq!(yin.estimate(&signal, 44100, narrow), NO_PITCH);
    }

    #[test]
    fn adaptive_range() {
        let narrow = SearchRange::adaptive(100.0, true);
        assert!((narrow.min_freq - 90.0).abs() < 1e-4);
        assert!((narrow.max_freq - 110.0).abs() < 1e-4);
        assert_eq!(SearchRange::adaptive(100.0, false), SearchRange::default());
        assert_eq!(SearchRange::adaptive(-1.0, true), SearchRange::default());
    }

    #[test]
    fn rms_level() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[1.0, -1.0, 1.0, -1.0]) - 1.0).abs() < 1e-6);
    }

    /// Records the range it was asked to search.
    struct RangeSpy(std::sync::Arc<std::sync::Mutex<Vec<SearchRange>>>, f32);

    impl PitchEstimator for RangeSpy {
        fn estimate(&mut self, _: &[f32], _: u32, range: SearchRange) -> f32 {
            self.0.lock().unwrap().push(range);
            self.1
        }
    }

    #[test]
    fn tracker_narrows_only_while_decaying() {
        let ranges = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut tracker = PitchTracker::new(Box::new(RangeSpy(ranges.clone(), 200.0)));

        let first = tracker.track(&sine(200.0, 8000, 256, 0.8), 8000);
        tracker.track(&sine(200.0, 8000, 256, 0.4), 8000);
        tracker.track(&sine(200.0, 8000, 256, 0.9), 8000);
        assert_eq!(
            first,
            PitchSample {
                frequency: 200.0,
                sample_rate: 8000,
            }
        );

        let ranges = ranges.lock().unwrap();
        assert_eq!(ranges[0], SearchRange::default());
        assert!((ranges[1].min_freq - 180.0).abs() < 1e-3);
        assert!((ranges[1].max_freq - 220.0).abs() < 1e-3);
        assert_eq!(ranges[2], SearchRange::default());
    }

    #[test]
    fn refinement_stays_close() {
        let mut yin = YinEstimator::default().with_spectral_refinement(true);
        let signal = sine(196.0, 44100, 4096, 0.5);
        let detected = yin.estimate(&signal, 44100, SearchRange::default());
        assert!((detected - 196.0).abs() < 3.0, "got {detected}");
    }
}
