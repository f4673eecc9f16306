//! User-facing strings for each supported language.

use tuneo_core::config::Language;
use tuneo_core::{InstrumentKind, TuningReference};

/// Text shown by the terminal front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub guitar: &'static str,
    pub chromatic: &'static str,
    pub instrument: &'static str,
    pub no_tone: &'static str,
    pub reference_a4: &'static str,
    pub tuning_440: &'static str,
    pub tuning_432: &'static str,
    pub tuning_444: &'static str,
    pub waiting: &'static str,
    pub denied: &'static str,
    pub press_enter: &'static str,
}

const EN: Labels = Labels {
    guitar: "Guitar",
    chromatic: "Chromatic",
    instrument: "Instrument",
    no_tone: "No tone",
    reference_a4: "Reference (A4)",
    tuning_440: "440Hz (standard)",
    tuning_432: "432Hz (Verdi)",
    tuning_444: "444Hz (high pitch)",
    waiting: "Waiting for audio...",
    denied: "Microphone unavailable",
    press_enter: "Press Enter to quit",
};

const ES: Labels = Labels {
    guitar: "Guitarra",
    chromatic: "Cromática",
    instrument: "Instrumento",
    no_tone: "Sin tono",
    reference_a4: "Referencia (A4)",
    tuning_440: "440Hz (estándar)",
    tuning_432: "432Hz (Verdi)",
    tuning_444: "444Hz (tono alto)",
    waiting: "Esperando audio...",
    denied: "Micrófono no disponible",
    press_enter: "Pulsa Enter para salir",
};

impl Labels {
    pub fn for_language(language: Language) -> &'static Labels {
        match language {
            Language::En => &EN,
            Language::Es => &ES,
        }
    }

    pub fn instrument_name(&self, kind: InstrumentKind) -> &'static str {
        match kind {
            InstrumentKind::Guitar => self.guitar,
            InstrumentKind::Chromatic => self.chromatic,
        }
    }

    pub fn tuning_name(&self, tuning: TuningReference) -> &'static str {
        match tuning {
            TuningReference::Ref440 => self.tuning_440,
            TuningReference::Ref432 => self.tuning_432,
            TuningReference::Ref444 => self.tuning_444,
        }
    }
}
