//! # Fast Fourier Transform (FFT) Module
//!
//! Magnitude spectrum of an audio buffer, used to refine YIN estimates.
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Hann windowing for reduced spectral leakage
//! - DC offset removal
//! - Sub-bin peak interpolation

use rustfft::{FftPlanner, num_complex::Complex};

/// Removes the DC offset from a signal by making its average value zero.
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Applies a Hann window to the input buffer to reduce spectral leakage.
fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

/// Magnitudes of the first half of the spectrum (up to Nyquist).
///
/// The signal is DC-corrected and Hann-windowed first. Any length is
/// accepted; an empty signal gives an empty spectrum.
pub fn magnitude_spectrum(signal: &[f32]) -> Vec<f32> {
    if signal.is_empty() {
        return Vec::new();
    }

    let mut processed = signal.to_vec();
    remove_dc_offset(&mut processed);
    apply_hann_window(&mut processed);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(processed.len());

    let mut buffer: Vec<Complex<f32>> = processed
        .into_iter()
        .map(|sample| Complex { re: sample, im: 0.0 })
        .collect();
    fft.process(&mut buffer);

    buffer
        .iter()
        .take(signal.len() / 2)
        .map(|c| c.norm())
        .collect()
}

/// Refines a frequency estimate using a pre-computed magnitude spectrum.
///
/// Looks for the strongest bin within two bins of `rough_freq` and fits a
/// parabola through the log magnitudes around it.
///
/// # Arguments
/// * `magnitudes` - output of [`magnitude_spectrum`]
/// * `buffer_size` - length of the signal the spectrum was computed from
/// * `rough_freq` - initial estimate in Hz
/// * `sample_rate` - sample rate in Hz
///
/// # Returns
/// * `Some(refined_freq)` - refined estimate, or `rough_freq` when no better one exists
/// * `None` - `rough_freq` was not positive or the spectrum is unusable
pub fn refine_from_spectrum(
    magnitudes: &[f32],
    buffer_size: usize,
    rough_freq: f32,
    sample_rate: u32,
) -> Option<f32> {
    if rough_freq <= 0.0 || magnitudes.len() < 3 || buffer_size == 0 || sample_rate == 0 {
        return None;
    }
    let last = magnitudes.len() - 1;
    let target_bin = (rough_freq * buffer_size as f32) / sample_rate as f32;
    let search_radius = 2.0;
    let start_bin = (target_bin - search_radius).max(0.0) as usize;
    let end_bin = ((target_bin + search_radius).min(last as f32) as usize).min(last);
    if start_bin >= end_bin {
        return Some(rough_freq);
    }

    let peak_bin = magnitudes[start_bin..=end_bin]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(offset, _)| start_bin + offset)?;

    if peak_bin == 0 || peak_bin >= last {
        return Some(rough_freq);
    }

    let y1 = magnitudes[peak_bin - 1].ln();
    let y2 = magnitudes[peak_bin].ln();
    let y3 = magnitudes[peak_bin + 1].ln();
    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return Some(rough_freq);
    }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 {
        return Some(rough_freq);
    }

    let peak_shift = (y3 - y1) / (2.0 * denominator);
    let final_freq = ((peak_bin as f32 + peak_shift) * sample_rate as f32) / buffer_size as f32;

    if final_freq.is_finite() && final_freq > 0.0 {
        Some(final_freq)
    } else {
        Some(rough_freq)
    }
}
