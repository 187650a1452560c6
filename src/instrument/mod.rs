/// Instrument recipes.
///
/// [`InstrumentFactory::build`] turns an [`Instrument`], a pitch and the
/// current [`Settings`] into an [`InstrumentGraph`]: a synthesis source
/// under its own anti-click fader, optionally through the global low-pass.
use crate::dsp::envelope::{Adsr, Fader};
use crate::dsp::filter::Filter;
use crate::dsp::noise::PinkNoise;
use crate::dsp::oscillator::{FmOscillator, RcOscillator, Sine, Square, SuperSaw};
use crate::dsp::pitch_shift::PitchShifter;
use crate::dsp::sampler::SamplePlayer;
use crate::dsp::{Effect, Param, Processed, Product, Scaled, Signal, Sum};
use crate::error::Result;
use crate::settings::{EngineConfig, Settings};
use samples::SampleBank;

pub mod samples;

/// Fade-in of every instrument voice, in seconds.
pub const FADE_IN_SECS: f32 = 0.02;
/// Fade-out of every instrument voice, in seconds.
pub const FADE_OUT_SECS: f32 = 0.1;

/// Transposition applied to looped samples, in semitones.
const SAMPLE_TRANSPOSE: f32 = 0.5;
const PITCH_SHIFT_WINDOW_SECS: f32 = 0.1;

/// Gray used for cells that are off.
pub const OFF_COLOR: [u8; 3] = [70, 70, 70];
/// Highlight for cells in the playing column.
pub const ACTIVE_COLOR: [u8; 3] = [255, 255, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Sine,
    Saw,
    Square,
    Samples,
    MySynth,
    Fm,
    Drumkit,
}

impl Instrument {
    pub const COUNT: usize = 7;

    pub const ALL: [Instrument; Self::COUNT] = [
        Instrument::Sine,
        Instrument::Saw,
        Instrument::Square,
        Instrument::Samples,
        Instrument::MySynth,
        Instrument::Fm,
        Instrument::Drumkit,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The next instrument in the toggle cycle, `None` after the last one.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Sine => "sine",
            Instrument::Saw => "saw",
            Instrument::Square => "square",
            Instrument::Samples => "samples",
            Instrument::MySynth => "mysynth",
            Instrument::Fm => "fm",
            Instrument::Drumkit => "drumkit",
        }
    }

    /// Parse a name from the control surface; anything unknown plays as a sine.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| {
                log::debug!("Unknown instrument {:?}, falling back to sine", name);
                Instrument::Sine
            })
    }

    /// Button label: the name with its first letter capitalized.
    pub fn label(self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }

    pub fn color(self) -> [u8; 3] {
        match self {
            Instrument::Sine => [0, 200, 0],
            Instrument::Saw => [0, 0, 200],
            Instrument::Square => [200, 200, 0],
            Instrument::Samples => [200, 0, 0],
            Instrument::MySynth => [128, 0, 128],
            Instrument::Fm => [255, 0, 255],
            Instrument::Drumkit => [255, 165, 0],
        }
    }
}

/// One playable instrument voice: source × fader, then the optional
/// global low-pass.
pub struct InstrumentGraph {
    source: Box<dyn Signal>,
    fader: Fader,
    filter: Option<Filter>,
}

impl InstrumentGraph {
    pub fn fader(&self) -> &Fader {
        &self.fader
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }
}

impl Signal for InstrumentGraph {
    fn tick(&mut self) -> f32 {
        let y = self.source.tick() * self.fader.next_level();
        match self.filter.as_mut() {
            Some(filter) => filter.process(y),
            None => y,
        }
    }

    fn set(&mut self, param: Param) {
        match param {
            Param::Gain(gain) => self.fader.set_gain(gain),
            other => self.source.set(other),
        }
    }

    fn release(&mut self) {
        self.fader.stop();
    }

    fn is_finished(&self) -> bool {
        self.fader.is_finished()
    }
}

/// Builds instrument graphs at the output sample rate.
pub struct InstrumentFactory {
    sample_rate: f32,
    samples: SampleBank,
}

impl InstrumentFactory {
    pub fn new(sample_rate: f32, config: &EngineConfig) -> Self {
        Self {
            sample_rate,
            samples: SampleBank::new(config.sample_dir.clone()),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &SampleBank {
        &self.samples
    }

    /// Build a started voice for `instrument` at `freq`, using the volume,
    /// filter and sample selection from `settings`.
    pub fn build(
        &mut self,
        instrument: Instrument,
        freq: f32,
        settings: &Settings,
    ) -> Result<InstrumentGraph> {
        let sr = self.sample_rate;
        let volume = settings.volume;

        let source: Box<dyn Signal> = match instrument {
            Instrument::Sine => Box::new(Sine::new(freq, sr)),
            Instrument::Saw => Box::new(SuperSaw::new(freq, sr)),
            Instrument::Square => Box::new(Square::new(freq, sr)),
            Instrument::Samples => {
                let data = self.samples.get(settings.sample)?;
                Box::new(Processed::new(
                    Box::new(SamplePlayer::new(data, 1.0, sr)),
                    Box::new(PitchShifter::new(SAMPLE_TRANSPOSE, PITCH_SHIFT_WINDOW_SECS, sr)),
                ))
            }
            Instrument::MySynth => {
                let body = Sum::new(vec![
                    Box::new(RcOscillator::new(freq, 0.8, sr)),
                    Box::new(Scaled::new(Box::new(Sine::new(freq * 0.5, sr)), 0.2)),
                    Box::new(Scaled::new(Box::new(PinkNoise::new()), 0.1)),
                ]);
                Box::new(Processed::new(
                    Box::new(body),
                    Box::new(Filter::band_pass(freq, 1.2, sr)?),
                ))
            }
            Instrument::Fm => Box::new(FmOscillator::new(freq, freq / 200.0, 10.0, sr)),
            Instrument::Drumkit => self.drum(freq, volume)?,
        };

        let fader = Fader::new(FADE_IN_SECS, FADE_OUT_SECS, volume, sr).play();
        let filter = if settings.filter.enabled {
            Some(Filter::low_pass(settings.filter.frequency, sr)?)
        } else {
            None
        };

        Ok(InstrumentGraph {
            source,
            fader,
            filter,
        })
    }

    /// Kick below 100 Hz, snare below 200 Hz, hi-hat above. Each hit has
    /// its own envelope inside the outer fader.
    fn drum(&self, freq: f32, volume: f32) -> Result<Box<dyn Signal>> {
        let sr = self.sample_rate;
        let hit: Box<dyn Signal> = if freq < 100.0 {
            let body = Scaled::new(Box::new(Sine::new(freq, sr)), volume);
            let env = Adsr::new(0.01, 0.15, 0.0, 0.1, volume, sr);
            Box::new(Product::new(Box::new(body), Box::new(env)))
        } else if freq < 200.0 {
            let noise = Scaled::new(Box::new(PinkNoise::new()), volume * 0.5);
            let filter = Filter::band_pass(2000.0, 0.8, sr)?;
            let body = Processed::new(Box::new(noise), Box::new(filter));
            let env = Adsr::new(0.01, 0.2, 0.0, 0.1, volume, sr);
            Box::new(Product::new(Box::new(body), Box::new(env)))
        } else {
            let noise = Scaled::new(Box::new(PinkNoise::new()), volume * 0.3);
            let filter = Filter::band_pass(8000.0, 1.0, sr)?;
            let body = Processed::new(Box::new(noise), Box::new(filter));
            let env = Adsr::new(0.01, 0.05, 0.0, 0.02, volume, sr);
            Box::new(Product::new(Box::new(body), Box::new(env)))
        };
        Ok(hit)
    }
}
