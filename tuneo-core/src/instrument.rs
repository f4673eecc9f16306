//! # Instrument Module
//!
//! Maps a detected frequency to the target the player should tune towards:
//! one of a fixed set of strings, or the nearest chromatic note.
//!
//! Instruments are immutable. A change of instrument or tuning reference
//! builds a new [`Instrument`], which discards the frequency table derived
//! from the previous reference.

use crate::tuning::{self, Note, NoteName, TuningReference};
use serde::{Deserialize, Serialize};

/// Standard guitar tuning, 6th string first.
pub const GUITAR_STRINGS: [Note; 6] = [
    Note::new(NoteName::E, 2),
    Note::new(NoteName::A, 2),
    Note::new(NoteName::D, 3),
    Note::new(NoteName::G, 3),
    Note::new(NoteName::B, 3),
    Note::new(NoteName::E, 4),
];

/// Selectable instrument types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    #[default]
    Guitar,
    Chromatic,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 2] = [Self::Guitar, Self::Chromatic];

    pub fn id(self) -> &'static str {
        match self {
            Self::Guitar => "guitar",
            Self::Chromatic => "chromatic",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }
}

/// The note/frequency pair the pitch is currently compared against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentTarget {
    pub note: Note,
    /// Exact frequency of `note` under the active tuning, in Hz
    pub frequency: f32,
}

impl InstrumentTarget {
    /// Two targets denote the same note regardless of frequency.
    pub fn same_note(&self, other: &InstrumentTarget) -> bool {
        self.note == other.note
    }
}

/// An instrument bound to a tuning reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Instrument {
    /// Fretted instrument with an ordered list of open strings, low to high.
    FixedString {
        tuning: TuningReference,
        notes: Vec<Note>,
        /// String frequencies for `tuning`, same order as `notes`
        frequencies: Vec<f32>,
    },
    /// Free mode: the target is the nearest semitone.
    Chromatic { tuning: TuningReference },
}

impl Instrument {
    /// Builds the instrument for a configuration entry.
    pub fn new(kind: InstrumentKind, tuning: TuningReference) -> Self {
        match kind {
            InstrumentKind::Guitar => Self::fixed_string(&GUITAR_STRINGS, tuning),
            InstrumentKind::Chromatic => Self::Chromatic { tuning },
        }
    }

    /// Builds a fixed-string instrument from any ordered list of notes.
    pub fn fixed_string(notes: &[Note], tuning: TuningReference) -> Self {
        let frequencies = notes
            .iter()
            .map(|&note| tuning::frequency_from_note(Some(note), tuning))
            .collect();
        Self::FixedString {
            tuning,
            notes: notes.to_vec(),
            frequencies,
        }
    }

    pub fn tuning(&self) -> TuningReference {
        match self {
            Self::FixedString { tuning, .. } | Self::Chromatic { tuning } => *tuning,
        }
    }

    /// Ordered string notes, low to high. Empty in chromatic mode.
    pub fn strings(&self) -> &[Note] {
        match self {
            Self::FixedString { notes, .. } => notes,
            Self::Chromatic { .. } => &[],
        }
    }

    /// Finds the target nearest to `frequency`.
    ///
    /// # Returns
    /// * `Some(target)` - the closest string, or the nearest chromatic note
    /// * `None` - no tone, or a frequency outside the supported note range
    pub fn nearest_target(&self, frequency: f32) -> Option<InstrumentTarget> {
        match self {
            Self::FixedString {
                notes, frequencies, ..
            } => {
                let idx = nearest_index(frequency, frequencies)?;
                Some(InstrumentTarget {
                    note: notes[idx],
                    frequency: frequencies[idx],
                })
            }
            Self::Chromatic { tuning } => {
                let note = tuning::note_from_frequency(frequency, *tuning)?;
                Some(InstrumentTarget {
                    note,
                    frequency: tuning::frequency_from_note(Some(note), *tuning),
                })
            }
        }
    }
}

/// Index of the entry in `freqs` closest to `frequency`.
///
/// Ties go to the first occurrence. Returns `None` for `frequency <= 0`
/// (or NaN) and for an empty list.
pub fn nearest_index(frequency: f32, freqs: &[f32]) -> Option<usize> {
    if !(frequency > 0.0) {
        return None;
    }
    let mut min_distance = f32::INFINITY;
    let mut min_idx = None;
    for (i, &f) in freqs.iter().enumerate() {
        let d = (frequency - f).abs();
        if d < min_distance {
            min_distance = d;
            min_idx = Some(i);
        }
    }
    min_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_string_frequency_selects_that_string() {
        let guitar = Instrument::new(InstrumentKind::Guitar, TuningReference::Ref440);
        let Instrument::FixedString { frequencies, .. } = &guitar else {
            panic!("guitar must be a fixed-string instrument");
        };
        for (i, &f) in frequencies.iter().enumerate() {
            let target = guitar.nearest_target(f).unwrap();
            assert_eq!(target.note, GUITAR_STRINGS[i]);
            assert_eq!(target.frequency, f);
        }
    }

    #[test]
    fn guitar_picks_closest_string() {
        let guitar = Instrument::new(InstrumentKind::Guitar, TuningReference::Ref440);
        assert_eq!(guitar.nearest_target(100.0).unwrap().note, Note::new(NoteName::A, 2));
        assert_eq!(guitar.nearest_target(30.0).unwrap().note, Note::new(NoteName::E, 2));
        assert_eq!(guitar.nearest_target(2000.0).unwrap().note, Note::new(NoteName::E, 4));
    }

    #[test]
    fn no_tone_has_no_target() {
        let guitar = Instrument::new(InstrumentKind::Guitar, TuningReference::Ref440);
        let chromatic = Instrument::new(InstrumentKind::Chromatic, TuningReference::Ref440);
        for f in [0.0, -1.0, f32::NAN] {
            assert_eq!(guitar.nearest_target(f), None);
            assert_eq!(chromatic.nearest_target(f), None);
        }
    }

    #[test]
    fn chromatic_returns_exact_note_frequency() {
        let chromatic = Instrument::new(InstrumentKind::Chromatic, TuningReference::Ref432);
        let target = chromatic.nearest_target(435.0).unwrap();
        assert_eq!(target.note, Note::new(NoteName::A, 4));
        assert_eq!(target.frequency, 432.0);
        assert!(chromatic.strings().is_empty());
    }

    #[test]
    fn string_table_follows_tuning() {
        let a440 = Instrument::new(InstrumentKind::Guitar, TuningReference::Ref440);
        let a432 = Instrument::new(InstrumentKind::Guitar, TuningReference::Ref432);
        let f440 = a440.nearest_target(110.0).unwrap().frequency;
        let f432 = a432.nearest_target(110.0).unwrap().frequency;
        assert_eq!(f440, 110.0);
        assert_eq!(f432, 108.0);
        assert_eq!(a432.tuning(), TuningReference::Ref432);
    }

    #[test]
    fn ties_go_to_first_entry() {
        assert_eq!(nearest_index(150.0, &[100.0, 200.0]), Some(0));
        assert_eq!(nearest_index(150.0, &[]), None);
    }

    #[test]
    fn kinds() {
        let guitar = Instrument::new(InstrumentKind::Guitar, TuningReference::Ref440);
        assert_eq!(guitar.strings(), GUITAR_STRINGS.as_slice());
        let chromatic = Instrument::new(InstrumentKind::Chromatic, TuningReference::Ref440);
        assert!(chromatic.strings().is_empty());
        assert_eq!(InstrumentKind::from_id("chromatic"), Some(InstrumentKind::Chromatic));
        assert_eq!(InstrumentKind::from_id("any"), None);
    }
}
