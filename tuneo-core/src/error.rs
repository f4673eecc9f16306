//! # Error Module
//!
//! Errors that can leave the core crate. Numeric edge cases (silence, zero
//! frequencies, empty buffers) are never errors: they travel through the
//! pipeline as `None` or sentinel values. What remains are failures of the
//! outside world: the audio device and the configuration file.

use std::path::PathBuf;

/// Crate-level error type for the tuner core.
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// The host exposes no default input device (or access was refused).
    #[error("no audio input device available")]
    NoInputDevice,

    /// The device offers no configuration the tuner can read.
    #[error("no supported input format found on `{device}`")]
    NoSupportedFormat { device: String },

    /// Querying the device configurations failed.
    #[error(transparent)]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    /// The input stream could not be built.
    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The input stream could not be started.
    #[error(transparent)]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The capture thread ended before reporting whether the stream started.
    #[error("capture thread exited before the stream started")]
    CaptureThread,

    /// A capture source was started twice.
    #[error("capture source is already running")]
    AlreadyRunning,

    /// The worker thread could not be spawned.
    #[error("failed to spawn `{name}` thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the configuration file failed.
    #[error("configuration file `{path}`: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be serialized.
    #[error(transparent)]
    ConfigFormat(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TunerError>;
