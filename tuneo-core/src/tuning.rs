//! # Musical Tuning Module
//!
//! Frequency/note arithmetic for equal temperament under a selectable
//! reference pitch for A4.
//!
//! ## Features
//! - Reference pitches of 440, 432 and 444 Hz
//! - Nearest-note lookup with octave numbering starting at C
//! - Exact inverse (note to frequency) for every note the lookup produces
//! - Cent deviation for the numeric readout

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest octave the tuner reports.
pub const MIN_OCTAVE: i32 = 0;
/// Highest octave the tuner reports.
pub const MAX_OCTAVE: i32 = 8;

/// The frequency assigned to A4, from which every other note is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TuningReference {
    /// A4 = 440 Hz (standard pitch)
    #[default]
    #[serde(rename = "ref_440")]
    Ref440,
    /// A4 = 432 Hz
    #[serde(rename = "ref_432")]
    Ref432,
    /// A4 = 444 Hz
    #[serde(rename = "ref_444")]
    Ref444,
}

impl TuningReference {
    pub const ALL: [TuningReference; 3] = [Self::Ref440, Self::Ref432, Self::Ref444];

    /// Frequency of A4 in Hz.
    pub fn a4(self) -> f32 {
        match self {
            Self::Ref440 => 440.0,
            Self::Ref432 => 432.0,
            Self::Ref444 => 444.0,
        }
    }

    /// Identifier used in the persisted configuration.
    pub fn id(self) -> &'static str {
        match self {
            Self::Ref440 => "ref_440",
            Self::Ref432 => "ref_432",
            Self::Ref444 => "ref_444",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }
}

/// One of the twelve pitch classes, ordered from C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    /// Pitch classes in chromatic order starting at C.
    pub const ALL: [NoteName; 12] = [
        Self::C,
        Self::CSharp,
        Self::D,
        Self::DSharp,
        Self::E,
        Self::F,
        Self::FSharp,
        Self::G,
        Self::GSharp,
        Self::A,
        Self::ASharp,
        Self::B,
    ];

    /// Position within the octave, C = 0 .. B = 11.
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Signed semitone distance from A within the same octave.
    pub fn offset_from_a(self) -> i32 {
        self.index() - Self::A.index()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::CSharp => "C#",
            Self::D => "D",
            Self::DSharp => "D#",
            Self::E => "E",
            Self::F => "F",
            Self::FSharp => "F#",
            Self::G => "G",
            Self::GSharp => "G#",
            Self::A => "A",
            Self::ASharp => "A#",
            Self::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pitch class together with its octave number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub name: NoteName,
    pub octave: i32,
}

impl Note {
    pub const fn new(name: NoteName, octave: i32) -> Self {
        Self { name, octave }
    }

    /// Semitones between this note and A4 (negative below A4).
    pub fn semitones_from_a4(self) -> i32 {
        12 * (self.octave - 4) + self.name.offset_from_a()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Finds the nearest equal-tempered note to a frequency.
///
/// The semitone distance from A4 is `12 * log2(freq / A4)`, rounded half
/// away from zero. Octaves change between B and C.
///
/// # Returns
/// * `Some(note)` - nearest note within octaves 0..=8
/// * `None` - no tone (`freq <= 0`, non-finite) or a note outside the supported range
pub fn note_from_frequency(freq: f32, tuning: TuningReference) -> Option<Note> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }

    let semitones_from_a4 = 12.0 * (freq / tuning.a4()).log2();
    // A4 sits nine semitones above C4.
    let semitones_from_c4 = (semitones_from_a4 + 9.0).round() as i32;

    let name = NoteName::ALL[semitones_from_c4.rem_euclid(12) as usize];
    let octave = 4 + semitones_from_c4.div_euclid(12);

    if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        return None;
    }
    Some(Note { name, octave })
}

/// Frequency of a note in Hz: `A4 * 2^(semitones_from_a4 / 12)`.
///
/// Returns 0 for an absent note.
pub fn frequency_from_note(note: Option<Note>, tuning: TuningReference) -> f32 {
    match note {
        Some(note) => tuning.a4() * 2.0_f32.powf(note.semitones_from_a4() as f32 / 12.0),
        None => 0.0,
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents = 1 semitone; positive values are sharp, negative flat.
/// Returns `None` unless both frequencies are positive.
pub fn cents_between(freq: f32, target_freq: f32) -> Option<f32> {
    if !(freq > 0.0 && target_freq > 0.0) {
        return None;
    }
    Some(1200.0 * (freq / target_freq).log2())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn a4_matches_reference() {
        let a4 = Some(Note::new(NoteName::A, 4));
        assert_eq!(frequency_from_note(a4, TuningReference::Ref440), 440.0);
        assert_eq!(frequency_from_note(a4, TuningReference::Ref432), 432.0);
        assert_eq!(frequency_from_note(a4, TuningReference::Ref444), 444.0);
    }

    #[test]
    fn absent_note_has_zero_frequency() {
        assert_eq!(frequency_from_note(None, TuningReference::Ref440), 0.0);
    }

    #[test]
    fn octave_boundary_is_between_b_and_c() {
        let b3 = frequency_from_note(Some(Note::new(NoteName::B, 3)), TuningReference::Ref440);
        let c4 = frequency_from_note(Some(Note::new(NoteName::C, 4)), TuningReference::Ref440);
        assert_eq!(
            note_from_frequency(b3, TuningReference::Ref440),
            Some(Note::new(NoteName::B, 3))
        );
        assert_eq!(
            note_from_frequency(c4, TuningReference::Ref440),
            Some(Note::new(NoteName::C, 4))
        );
        assert_relative_eq!(c4, 261.6256, epsilon = 1e-3);
    }

    #[test]
    fn low_e_string() {
        let note = note_from_frequency(82.0, TuningReference::Ref440);
        assert_eq!(note, Some(Note::new(NoteName::E, 2)));
    }

    #[test]
    fn silence_and_garbage_have_no_note() {
        assert_eq!(note_from_frequency(0.0, TuningReference::Ref440), None);
        assert_eq!(note_from_frequency(-12.0, TuningReference::Ref440), None);
        assert_eq!(note_from_frequency(f32::NAN, TuningReference::Ref440), None);
        assert_eq!(note_from_frequency(f32::INFINITY, TuningReference::Ref440), None);
    }

    #[test]
    fn out_of_range_is_treated_as_no_signal() {
        // Below C0 (~16.35 Hz) and above B8 (~7902 Hz)
        assert_eq!(note_from_frequency(8.0, TuningReference::Ref440), None);
        assert_eq!(note_from_frequency(12_000.0, TuningReference::Ref440), None);
    }

    #[test]
    fn reference_changes_the_nearest_note() {
        assert_eq!(
            note_from_frequency(438.0, TuningReference::Ref432),
            Some(Note::new(NoteName::A, 4))
        );
        assert_eq!(
            note_from_frequency(452.0, TuningReference::Ref432),
            Some(Note::new(NoteName::ASharp, 4))
        );
        assert_eq!(
            note_from_frequency(444.0, TuningReference::Ref444),
            Some(Note::new(NoteName::A, 4))
        );
        assert_eq!(
            note_from_frequency(432.0, TuningReference::Ref432),
            Some(Note::new(NoteName::A, 4))
        );
    }

    #[test]
    fn cents() {
        assert_relative_eq!(cents_between(880.0, 440.0).unwrap(), 1200.0, epsilon = 1e-3);
        assert_relative_eq!(cents_between(440.0, 440.0).unwrap(), 0.0);
        assert_eq!(cents_between(0.0, 440.0), None);
        assert_eq!(cents_between(440.0, 0.0), None);
    }

    #[test]
    fn ids_roundtrip() {
        for t in TuningReference::ALL {
            assert_eq!(TuningReference::from_id(t.id()), Some(t));
        }
        assert_eq!(TuningReference::from_id("ref_441"), None);
    }

    #[test]
    fn display() {
        assert_eq!(Note::new(NoteName::CSharp, 3).to_string(), "C#3");
    }
}
