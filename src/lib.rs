/// HueGrid - a 10x10 step sequencer with a hue-tracking voice
///
/// This library provides the core components behind the control surface:
/// - Grid sequencing with per-cell instruments and per-column mixing
/// - Synthesis building blocks and the instrument recipes built from them
/// - A lock-free voice bus in front of the audio device
/// - Hue tracking on camera frames, driving a smoothed oscillator voice

pub mod audio;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod instrument;
pub mod scale;
pub mod sequencer;
pub mod settings;
pub mod tone;
pub mod vision;

// Re-export commonly used types
pub use audio::{AudioOutput, Bus, FALLBACK_SAMPLE_RATE};
pub use engine::{Engine, TickReport};
pub use error::{Error, Result};
pub use instrument::{Instrument, InstrumentFactory};
pub use sequencer::playback::{Metronome, PlaybackEvent};
pub use sequencer::{interval_for_speed, Grid, StepScheduler, GRID_SIZE};
pub use settings::{level_to_unit, EngineConfig, SampleChoice, Settings};
pub use tone::{ToneController, ToneState};
pub use vision::{FrameSource, HueTracker, TestPattern};
