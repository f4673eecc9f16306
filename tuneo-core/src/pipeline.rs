//! # Tuner Pipeline
//!
//! Runs one pitch estimate through the tuner stages and produces an
//! immutable [`TunerFrame`] for the presentation layer:
//!
//! ```text
//! pitch -> Instrument::nearest_target -> StringStabilizer::vote
//!       -> deviation / colour -> HistoryTimeline::append
//! raw buffer -> waveform::align -> waveform::scale_to_view
//! ```
//!
//! The pipeline is synchronous and owns all of its state. Changing
//! instrument or tuning goes through [`TunerPipeline::reconfigure`], which
//! swaps the instrument and clears the vote queue and history together.

use crate::config::Configuration;
use crate::deviation::{self, Palette, Rgb, TuningHint};
use crate::instrument::{Instrument, InstrumentTarget};
use crate::pitch::PitchSample;
use crate::stabilizer::StringStabilizer;
use crate::timeline::{Clock, HISTORY_CAPACITY, HistoryTimeline, TracePoint};
use crate::tuning::{self, Note};
use crate::waveform;
use std::sync::Arc;

/// Scroll speed of the history trace, in pixels per second.
pub const TRACE_SPEED: f32 = 30.0;

/// Dimensions the frame geometry is computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    pub width: f32,
    pub waveform_height: f32,
    pub pixels_per_second: f32,
}

impl Default for ViewGeometry {
    fn default() -> Self {
        Self {
            width: 400.0,
            waveform_height: 100.0,
            pixels_per_second: TRACE_SPEED,
        }
    }
}

/// Everything the presentation layer needs after one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerFrame {
    /// Sequence number of the buffer, starting at 1
    pub buffer_id: u64,
    pub pitch: f32,
    pub sample_rate: u32,
    /// Nearest target for this buffer alone
    pub raw_target: Option<InstrumentTarget>,
    /// Debounced target shown to the user
    pub target: Option<InstrumentTarget>,
    pub deviation: Option<f32>,
    pub cents: Option<f32>,
    pub color: Rgb,
    pub hint: Option<TuningHint>,
    /// Strings of the active instrument, low to high
    pub strings: Arc<[Note]>,
    /// Trigger-aligned waveform in view coordinates
    pub waveform: Vec<(f32, f32)>,
    /// History trace, newest point first
    pub trace: Arc<[TracePoint]>,
}

impl TunerFrame {
    pub fn has_tone(&self) -> bool {
        self.pitch > 0.0
    }
}

/// The per-sample tuner state machine.
#[derive(Debug)]
pub struct TunerPipeline {
    config: Configuration,
    instrument: Instrument,
    strings: Arc<[Note]>,
    stabilizer: StringStabilizer,
    timeline: HistoryTimeline,
    palette: Palette,
    view: ViewGeometry,
    buffer_id: u64,
}

impl TunerPipeline {
    pub fn new(config: &Configuration, clock: Arc<dyn Clock>) -> Self {
        let instrument = Instrument::new(config.instrument, config.tuning);
        Self {
            strings: instrument.strings().into(),
            instrument,
            config: *config,
            stabilizer: StringStabilizer::default(),
            timeline: HistoryTimeline::new(HISTORY_CAPACITY, clock),
            palette: Palette::for_theme(config.theme),
            view: ViewGeometry::default(),
            buffer_id: 0,
        }
    }

    pub fn with_view(mut self, view: ViewGeometry) -> Self {
        self.view = view;
        self
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn displayed_target(&self) -> Option<&InstrumentTarget> {
        self.stabilizer.displayed()
    }

    pub fn timeline(&self) -> &HistoryTimeline {
        &self.timeline
    }

    /// Applies a new configuration.
    ///
    /// When instrument or tuning change, the instrument is rebuilt and the
    /// vote queue and history are cleared in the same call. Returns whether
    /// that reset happened.
    pub fn reconfigure(&mut self, config: &Configuration) -> bool {
        let reset = self.config.requires_reset(config);
        if reset {
            self.instrument = Instrument::new(config.instrument, config.tuning);
            self.strings = self.instrument.strings().into();
            self.stabilizer.reset();
            self.timeline.clear();
            log::info!(
                "[PIPELINE] Switched to {} at {}",
                config.instrument.id(),
                config.tuning.id()
            );
        }
        self.palette = Palette::for_theme(config.theme);
        self.config = *config;
        reset
    }

    /// Runs one pitch estimate (and its raw buffer) through the pipeline.
    pub fn process(&mut self, sample: &PitchSample, raw_samples: &[f32]) -> TunerFrame {
        self.buffer_id += 1;

        let raw_target = self.instrument.nearest_target(sample.frequency);
        let target = self.stabilizer.vote(raw_target).copied();

        let deviation = deviation::deviation(sample.frequency, target.as_ref());
        let color = self.palette.color_or_center(deviation);
        let hint = TuningHint::from_reading(sample.frequency, target.as_ref());
        let cents = target.and_then(|t| tuning::cents_between(sample.frequency, t.frequency));

        self.timeline.append(deviation);
        let trace = self
            .timeline
            .snapshot(self.view.pixels_per_second, self.view.width);

        let aligned = waveform::align(
            raw_samples,
            waveform::DEFAULT_SEARCH_FRACTION,
            Some(waveform::DEFAULT_MAX_LEN),
        );
        let waveform = waveform::scale_to_view(
            aligned,
            self.view.width,
            self.view.waveform_height,
            self.config.graphics.waveform_step(),
        );

        log::debug!(
            "[PIPELINE] #{} pitch={:.2} raw={:?} shown={:?} dev={:?}",
            self.buffer_id,
            sample.frequency,
            raw_target.map(|t| t.note),
            target.map(|t| t.note),
            deviation
        );

        TunerFrame {
            buffer_id: self.buffer_id,
            pitch: sample.frequency,
            sample_rate: sample.sample_rate,
            raw_target,
            target,
            deviation,
            cents,
            color,
            hint,
            strings: self.strings.clone(),
            waveform,
            trace,
        }
    }
}
