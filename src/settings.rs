/// Control-surface parameters.
///
/// The UI owns a [`Settings`] value and hands a reference to the engine on
/// every tick, frame and button event, so the engine never reads ambient
/// state.
use std::path::PathBuf;

use crate::sequencer::interval_for_speed;

/// Maximum position of the 0–10 level sliders.
pub const LEVEL_MAX: u8 = 10;

/// Convert a 0–10 slider level to a gain in `[0, 1]`.
pub fn level_to_unit(level: u8) -> f32 {
    level.min(LEVEL_MAX) as f32 / LEVEL_MAX as f32
}

/// The sample files the `samples` instrument can loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleChoice {
    #[default]
    BassSynth,
    BassSynth2,
    Drums,
    Guitar,
    HipHop,
    Kick,
    ReverseKeys,
    Synth,
}

impl SampleChoice {
    pub const ALL: [SampleChoice; 8] = [
        SampleChoice::BassSynth,
        SampleChoice::BassSynth2,
        SampleChoice::Drums,
        SampleChoice::Guitar,
        SampleChoice::HipHop,
        SampleChoice::Kick,
        SampleChoice::ReverseKeys,
        SampleChoice::Synth,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            SampleChoice::BassSynth => "bass_synth.wav",
            SampleChoice::BassSynth2 => "bass_synth2.wav",
            SampleChoice::Drums => "drums.wav",
            SampleChoice::Guitar => "guitar.wav",
            SampleChoice::HipHop => "hiphop.wav",
            SampleChoice::Kick => "kick.wav",
            SampleChoice::ReverseKeys => "reverse_keys.wav",
            SampleChoice::Synth => "synth.wav",
        }
    }
}

/// Global low-pass applied to every cell and hold voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub enabled: bool,
    /// Cutoff in Hz, 100–3000 on the control surface.
    pub frequency: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: 1000.0,
        }
    }
}

/// Hue tracking and hue voice parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueSettings {
    pub enabled: bool,
    /// Target hue on the 0–179 scale.
    pub target_hue: u8,
    /// Band half-width in steps of 10 hue units, 1–10.
    pub sensitivity: u8,
    pub volume: f32,
    pub reverb: f32,
}

impl Default for HueSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_hue: 50,
            sensitivity: 5,
            volume: 0.5,
            reverb: 0.5,
        }
    }
}

/// Snapshot of every control-surface value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Master gain for cell and hold voices, `[0, 1]`.
    pub volume: f32,
    /// Speed level 1–10.
    pub speed: u8,
    pub sample: SampleChoice,
    pub filter: FilterSettings,
    pub hue: HueSettings,
}

impl Settings {
    pub fn tick_interval_ms(&self) -> u64 {
        interval_for_speed(self.speed)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: 0.5,
            speed: 5,
            sample: SampleChoice::default(),
            filter: FilterSettings::default(),
            hue: HueSettings::default(),
        }
    }
}

/// Start-up configuration that does not change while running.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory the sample files are read from.
    pub sample_dir: PathBuf,
    /// Capacity of the control -> audio command queue.
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_dir: PathBuf::from("samples"),
            command_capacity: 1024,
        }
    }
}
