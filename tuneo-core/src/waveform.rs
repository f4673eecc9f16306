//! # Waveform Module
//!
//! Oscilloscope-style triggering for the raw input display. Each buffer is
//! cut so that it starts at its highest peak near the beginning, which makes
//! a periodic signal appear to stand still when redrawn buffer after buffer.

/// Fraction of the buffer searched for the trigger peak.
pub const DEFAULT_SEARCH_FRACTION: f32 = 0.25;

/// Longest aligned slice handed to the display.
pub const DEFAULT_MAX_LEN: usize = 2048;

/// Upper bound on the display gain, so near-silence is not blown up to full scale.
pub const MAX_WAVEFORM_GAIN: f32 = 20.0;

/// Returns a slice of `samples` that starts at its trigger peak.
///
/// The peak is the largest value (not magnitude) among the first
/// `len * search_fraction` samples. The slice is `len - search_window` long,
/// capped at `max_len`, so every buffer of the same length yields the same
/// output length.
///
/// An empty input gives an empty slice; a search window without positive
/// samples triggers at index 0.
pub fn align(samples: &[f32], search_fraction: f32, max_len: Option<usize>) -> &[f32] {
    if samples.is_empty() {
        return &[];
    }

    let fraction = if search_fraction.is_finite() {
        search_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let search_window = ((samples.len() as f32 * fraction).floor() as usize).min(samples.len());

    let peak_idx = trigger_index(&samples[..search_window]);

    let mut out_len = samples.len() - search_window;
    if let Some(max_len) = max_len {
        out_len = out_len.min(max_len);
    }
    &samples[peak_idx..peak_idx + out_len]
}

/// Index of the first strictly positive maximum, 0 if there is none.
fn trigger_index(window: &[f32]) -> usize {
    let mut max_value = 0.0;
    let mut max_idx = 0;
    for (idx, &sample) in window.iter().enumerate() {
        if sample > max_value {
            max_value = sample;
            max_idx = idx;
        }
    }
    max_idx
}

/// Maps samples to view coordinates, keeping every `step`-th one.
///
/// The signal is normalised to fill the height (gain capped at
/// [`MAX_WAVEFORM_GAIN`]) and centred on `height / 2`, positive up.
pub fn scale_to_view(samples: &[f32], width: f32, height: f32, step: usize) -> Vec<(f32, f32)> {
    if samples.is_empty() {
        return Vec::new();
    }

    let max_amplitude = samples.iter().fold(0.0f32, |max, &s| max.max(s.abs()));
    let gain = if max_amplitude > 0.0 {
        (1.0 / max_amplitude).min(MAX_WAVEFORM_GAIN)
    } else {
        MAX_WAVEFORM_GAIN
    };

    let amplitude = gain * height / 2.0;
    let dx = width / samples.len() as f32;
    let zero_y = height / 2.0;

    samples
        .iter()
        .enumerate()
        .step_by(step.max(1))
        .map(|(idx, &sample)| (idx as f32 * dx, zero_y - sample * amplitude))
        .collect()
}
