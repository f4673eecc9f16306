// tuneo-core/src/lib.rs

//! The core logic for the guitar and chromatic tuner.
//! This crate is responsible for audio capture, pitch detection, string
//! selection, deviation feedback and the scrolling history. It is completely
//! headless and contains no presentation code.

pub mod audio;
pub mod config;
pub mod deviation;
pub mod error;
pub mod fft;
pub mod instrument;
pub mod pipeline;
pub mod pitch;
pub mod session;
pub mod stabilizer;
pub mod timeline;
pub mod tuning;
pub mod waveform;

pub use config::Configuration;
pub use error::{Result, TunerError};
pub use instrument::{Instrument, InstrumentKind, InstrumentTarget};
pub use pipeline::{TunerFrame, TunerPipeline};
pub use session::{SessionStatus, TunerSession};
pub use tuning::{Note, NoteName, TuningReference};
