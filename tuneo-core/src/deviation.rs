//! # Deviation Module
//!
//! Turns the distance between pitch and target into a bounded feedback
//! signal and the colour used by the gauge.
//!
//! The deviation is `atan(k * rel_err) / (pi / 2)`: odd, monotonic and
//! bounded to (-1, 1). Near zero it is quasi-linear; errors beyond a
//! semitone are compressed towards the ends of the gauge.

use crate::config::Theme;
use crate::instrument::InstrumentTarget;
use std::f32::consts::FRAC_PI_2;
use std::fmt;

/// Gain applied to the relative frequency error before compression.
pub const DEVIATION_GAIN: f32 = 20.0;

/// Magnitude above which the hint shows a double arrow.
pub const STRONG_DEVIATION: f32 = 0.2;

/// Exponent applied to the position inside a colour segment.
const COLOR_EXPONENT: f32 = 0.3;

/// Bounded deviation of `pitch` from the target.
///
/// Positive is sharp, negative is flat.
///
/// # Returns
/// * `Some(d)` with `d` in (-1, 1)
/// * `None` - no tone, no target, or a target frequency that is not positive
pub fn deviation(pitch: f32, target: Option<&InstrumentTarget>) -> Option<f32> {
    let target = target?;
    if !pitch.is_finite() || pitch <= 0.0 || !(target.frequency > 0.0) {
        return None;
    }
    let relative = (pitch - target.frequency) / target.frequency;
    Some((DEVIATION_GAIN * relative).atan() / FRAC_PI_2)
}

/// An sRGB colour with floating-point channels in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Per-channel linear blend, `ratio` = 0 gives `self`.
    pub fn mix(self, other: Rgb, ratio: f32) -> Rgb {
        Rgb {
            r: (1.0 - ratio) * self.r + ratio * other.r,
            g: (1.0 - ratio) * self.g + ratio * other.g,
            b: (1.0 - ratio) * self.b + ratio * other.b,
        }
    }

    pub fn to_u8(self) -> [u8; 3] {
        [self.r, self.g, self.b].map(|c| c.round().clamp(0.0, 255.0) as u8)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_u8();
        write!(f, "rgb({}, {}, {})", r, g, b)
    }
}

/// Anchor colours for the gauge, from very flat to very sharp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub low: Rgb,
    pub low_mid: Rgb,
    pub center: Rgb,
    pub high_mid: Rgb,
    pub high: Rgb,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                low: Rgb::new(255.0, 60.0, 0.0),
                low_mid: Rgb::new(255.0, 200.0, 0.0),
                center: Rgb::new(120.0, 255.0, 0.0),
                high_mid: Rgb::new(255.0, 200.0, 0.0),
                high: Rgb::new(255.0, 60.0, 0.0),
            },
        }
    }

    /// Gauge colour for a deviation in [-1, 1].
    ///
    /// Anchors sit at -1, -0.2, 0, 0.2 and 1. Inside a segment the blend ratio
    /// is `t^0.3`, where `t` is the position within that segment, so the colour
    /// moves quickly away from its inner anchor and flattens towards the outer one.
    pub fn color(&self, deviation: f32) -> Rgb {
        if !deviation.is_finite() {
            return self.center;
        }
        let d = deviation.clamp(-1.0, 1.0);
        let magnitude = d.abs();
        let (inner, outer, t) = if magnitude <= STRONG_DEVIATION {
            let (inner, outer) = if d > 0.0 {
                (self.center, self.high_mid)
            } else {
                (self.center, self.low_mid)
            };
            (inner, outer, magnitude / STRONG_DEVIATION)
        } else {
            let (inner, outer) = if d > 0.0 {
                (self.high_mid, self.high)
            } else {
                (self.low_mid, self.low)
            };
            (inner, outer, (magnitude - STRONG_DEVIATION) / (1.0 - STRONG_DEVIATION))
        };
        inner.mix(outer, t.powf(COLOR_EXPONENT))
    }

    /// Colour for an optional deviation; no tone renders neutral.
    pub fn color_or_center(&self, deviation: Option<f32>) -> Rgb {
        deviation.map_or(self.center, |d| self.color(d))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::for_theme(Theme::default())
    }
}

/// Which way the player should turn the peg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningHint {
    /// The readout matches the target to a tenth of a hertz.
    InTune,
    /// Pitch is above the target.
    Sharp { strong: bool },
    /// Pitch is below the target.
    Flat { strong: bool },
}

impl TuningHint {
    /// Hint for the numeric readout, or `None` when there is nothing to compare.
    pub fn from_reading(pitch: f32, target: Option<&InstrumentTarget>) -> Option<Self> {
        let target = target?;
        let d = deviation(pitch, Some(target))?;
        if (pitch - target.frequency).abs() < 0.05 || d == 0.0 {
            return Some(Self::InTune);
        }
        let strong = d.abs() > STRONG_DEVIATION;
        Some(if d > 0.0 {
            Self::Sharp { strong }
        } else {
            Self::Flat { strong }
        })
    }
}

impl fmt::Display for TuningHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InTune => f.write_str("="),
            Self::Sharp { strong: false } => f.write_str("<"),
            Self::Sharp { strong: true } => f.write_str("<<"),
            Self::Flat { strong: false } => f.write_str(">"),
            Self::Flat { strong: true } => f.write_str(">>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::{Note, NoteName};
    use approx::assert_relative_eq;

    fn a4() -> InstrumentTarget {
        InstrumentTarget {
            note: Note::new(NoteName::A, 4),
            frequency: 440.0,
        }
    }

    #[test]
    fn zero_on_target() {
        assert_eq!(deviation(440.0, Some(&a4())), Some(0.0));
    }

    #[test]
    fn sign_follows_error() {
        assert!(deviation(441.0, Some(&a4())).unwrap() > 0.0);
        assert!(deviation(439.0, Some(&a4())).unwrap() < 0.0);
    }

    #[test]
    fn semitone_is_near_saturation() {
        let semitone_up = 440.0 * 2.0_f32.powf(1.0 / 12.0);
        let d = deviation(semitone_up, Some(&a4())).unwrap();
        assert!(d > 0.5 && d < 1.0, "d = {d}");
    }

    #[test]
    fn guards_before_division() {
        let zero = InstrumentTarget {
            frequency: 0.0,
            ..a4()
        };
        assert_eq!(deviation(440.0, Some(&zero)), None);
        assert_eq!(deviation(0.0, Some(&a4())), None);
        assert_eq!(deviation(-3.0, Some(&a4())), None);
        assert_eq!(deviation(440.0, None), None);
    }

    #[test]
    fn anchors_are_hit_exactly() {
        let p = Palette::default();
        assert_eq!(p.color(0.0), p.center);
        assert_eq!(p.color(0.2), p.high_mid);
        assert_eq!(p.color(-0.2), p.low_mid);
        assert_eq!(p.color(1.0), p.high);
        assert_eq!(p.color(-1.0), p.low);
    }

    #[test]
    fn continuous_at_inner_anchors() {
        let p = Palette::default();
        for anchor in [-0.2_f32, 0.2] {
            let inside = p.color(anchor - 1e-6 * anchor.signum());
            let outside = p.color(anchor + 1e-6 * anchor.signum());
            assert_relative_eq!(inside.g, outside.g, epsilon = 5.0);
            assert_relative_eq!(inside.r, outside.r, epsilon = 5.0);
        }
    }

    #[test]
    fn sensitive_near_zero() {
        let p = Palette::default();
        let small = p.color(0.01);
        // A twentieth of the way into the first segment already moves a third of the way.
        let moved = (p.center.r - small.r).abs() / (p.center.r - p.high_mid.r).abs();
        assert!(moved > 0.3, "moved = {moved}");
    }

    #[test]
    fn missing_deviation_is_neutral() {
        let p = Palette::default();
        assert_eq!(p.color_or_center(None), p.center);
        assert_eq!(p.color(f32::NAN), p.center);
    }

    #[test]
    fn css_formatting() {
        assert_eq!(Palette::default().center.to_string(), "rgb(120, 255, 0)");
    }

    #[test]
    fn hints() {
        let t = a4();
        assert_eq!(TuningHint::from_reading(440.01, Some(&t)), Some(TuningHint::InTune));
        assert_eq!(
            TuningHint::from_reading(441.0, Some(&t)),
            Some(TuningHint::Sharp { strong: false })
        );
        assert_eq!(
            TuningHint::from_reading(400.0, Some(&t)),
            Some(TuningHint::Flat { strong: true })
        );
        assert_eq!(TuningHint::from_reading(0.0, Some(&t)), None);
        assert_eq!(TuningHint::Flat { strong: true }.to_string(), ">>");
    }
}
