/// Error types for the huegrid crate.
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine, the audio output and the vision pipeline.
///
/// None of these are fatal for a running session: callers log them and skip
/// the current cycle.
#[derive(Error, Debug)]
pub enum Error {
    /// No default output device, or the device refused its default config.
    #[error("Audio device unavailable: {0}")]
    AudioDevice(String),

    /// The output stream could not be built or started.
    #[error("Audio stream error: {0}")]
    AudioStream(String),

    /// The device wants a sample format the mixer does not render.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// A sample file could not be read or decoded.
    #[error("Failed to load sample {path}: {source}")]
    SampleLoad {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// The `samples` instrument is disabled until another sample is selected.
    #[error("Sample {0} is unavailable")]
    SampleUnavailable(String),

    /// Filter coefficients were rejected (e.g. cutoff above Nyquist).
    #[error("Invalid filter parameters: {0}")]
    Filter(String),

    /// The frame source failed to deliver a frame.
    #[error("Frame capture failed: {0}")]
    Capture(String),

    /// A frame buffer does not match its declared dimensions.
    #[error("Invalid frame: expected {expected} bytes, got {got}")]
    FrameSize { expected: usize, got: usize },
}

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
