use approx::assert_relative_eq;
use std::sync::Arc;
use std::time::Duration;
use tuneo_core::config::{Configuration, GraphicsMode, Language, Theme};
use tuneo_core::deviation::Palette;
use tuneo_core::instrument::InstrumentKind;
use tuneo_core::pipeline::{TunerPipeline, ViewGeometry};
use tuneo_core::pitch::PitchSample;
use tuneo_core::timeline::{HISTORY_CAPACITY, ManualClock};
use tuneo_core::tuning::{Note, NoteName, TuningReference, frequency_from_note};

fn guitar() -> Configuration {
    Configuration {
        instrument: InstrumentKind::Guitar,
        tuning: TuningReference::Ref440,
        theme: Theme::Dark,
        language: Language::En,
        graphics: GraphicsMode::High,
    }
}

fn sample(frequency: f32) -> PitchSample {
    PitchSample {
        frequency,
        sample_rate: 44100,
    }
}

fn pipeline() -> (TunerPipeline, ManualClock) {
    let clock = ManualClock::default();
    (TunerPipeline::new(&guitar(), Arc::new(clock.clone())), clock)
}

#[test]
fn low_e_in_tune_end_to_end() {
    let (mut p, _clock) = pipeline();
    let e2 = Note::new(NoteName::E, 2);

    let frames: Vec<_> = (0..3).map(|_| p.process(&sample(82.4069), &[])).collect();
    let last = &frames[2];
    assert_eq!(frames[1].target, None);
    assert_eq!(last.target.map(|t| t.note), Some(e2));
    assert_relative_eq!(last.deviation.unwrap(), 0.0, epsilon = 1e-4);

    // Exactly on pitch renders the centre colour.
    let exact = frequency_from_note(Some(e2), TuningReference::Ref440);
    let frame = p.process(&sample(exact), &[]);
    assert_eq!(frame.deviation, Some(0.0));
    assert_eq!(frame.color, Palette::default().center);
}

#[test]
fn unanimous_votes_switch_the_target() {
    let (mut p, _clock) = pipeline();
    for _ in 0..3 {
        p.process(&sample(110.0), &[]);
    }
    let a2 = Note::new(NoteName::A, 2);
    let d3 = Note::new(NoteName::D, 3);
    assert_eq!(p.displayed_target().map(|t| t.note), Some(a2));

    // A lone outlier between two agreeing readings changes nothing.
    for f in [110.0, 146.8, 110.0] {
        let frame = p.process(&sample(f), &[]);
        assert_eq!(frame.target.map(|t| t.note), Some(a2));
    }

    // Three readings of the new string in a row do.
    let frames: Vec<_> = (0..3).map(|_| p.process(&sample(146.8), &[])).collect();
    assert_eq!(frames[1].target.map(|t| t.note), Some(a2));
    assert_eq!(frames[2].target.map(|t| t.note), Some(d3));
}

#[test]
fn history_spacing_follows_the_clock() {
    let (p, clock) = pipeline();
    let mut p = p.with_view(ViewGeometry {
        width: 300.0,
        waveform_height: 50.0,
        pixels_per_second: 40.0,
    });
    let mut last = None;
    for _ in 0..(HISTORY_CAPACITY + 100) {
        last = Some(p.process(&sample(110.5), &[]));
        clock.advance(Duration::from_millis(50));
    }
    let frame = last.unwrap();
    assert_eq!(p.timeline().len(), HISTORY_CAPACITY);
    assert_eq!(frame.trace.len(), HISTORY_CAPACITY);
    assert_eq!(frame.trace[0].y, 0.0);
    for pair in frame.trace.windows(2) {
        assert_relative_eq!(pair[1].y - pair[0].y, 2.0, epsilon = 1e-2);
    }
    // Slightly sharp: right of centre.
    assert!(frame.trace[0].x > 150.0 && frame.trace[0].x < 300.0);
}

#[test]
fn switching_instrument_starts_fresh() {
    let (mut p, _clock) = pipeline();
    for _ in 0..3 {
        p.process(&sample(440.0), &[]);
    }
    assert_eq!(p.displayed_target().map(|t| t.note), Some(Note::new(NoteName::E, 4)));

    let mut chromatic = guitar();
    chromatic.instrument = InstrumentKind::Chromatic;
    assert!(p.reconfigure(&chromatic));

    let frame = p.process(&sample(440.0), &[]);
    assert_eq!(frame.target, None);
    assert!(frame.strings.is_empty());
    assert_eq!(frame.trace.len(), 1);
    assert_eq!(frame.raw_target.map(|t| t.note), Some(Note::new(NoteName::A, 4)));
}
