/// Column voices - one mixed, compressed voice per playing step
use crate::audio::{Bus, VoiceHandle};
use crate::dsp::dynamics::Compressor;
use crate::dsp::envelope::Fader;
use crate::dsp::{Effect, Param, Signal};
use crate::error::Error;
use crate::instrument::{InstrumentFactory, InstrumentGraph};
use crate::scale::row_frequency;
use crate::settings::Settings;

use super::{Grid, StepAdvance, GRID_SIZE};

pub const COLUMN_FADE_IN_SECS: f32 = 0.05;
pub const COLUMN_FADE_OUT_SECS: f32 = 0.2;

const COMPRESSOR_THRESHOLD_DB: f32 = -6.0;
const COMPRESSOR_RATIO: f32 = 20.0;
const COMPRESSOR_ATTACK_SECS: f32 = 0.01;
const COMPRESSOR_RELEASE_SECS: f32 = 0.1;

/// Mix gain for a column of `voices` cells, `None` when the column is empty.
pub fn column_gain(voices: usize) -> Option<f32> {
    if voices == 0 {
        None
    } else {
        Some(0.5 / voices as f32)
    }
}

/// The cells of one column summed, compressed and faded as a single voice.
pub struct ColumnMix {
    inputs: Vec<InstrumentGraph>,
    gain: f32,
    compressor: Compressor,
    fader: Fader,
}

impl ColumnMix {
    /// `None` for an empty column.
    pub fn new(inputs: Vec<InstrumentGraph>, sample_rate: f32) -> Option<Self> {
        let gain = column_gain(inputs.len())?;
        Some(Self {
            inputs,
            gain,
            compressor: Compressor::new(
                COMPRESSOR_THRESHOLD_DB,
                COMPRESSOR_RATIO,
                COMPRESSOR_ATTACK_SECS,
                COMPRESSOR_RELEASE_SECS,
                sample_rate,
            ),
            fader: Fader::new(COLUMN_FADE_IN_SECS, COLUMN_FADE_OUT_SECS, 1.0, sample_rate).play(),
        })
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl Signal for ColumnMix {
    fn tick(&mut self) -> f32 {
        let sum: f32 = self.inputs.iter_mut().map(|g| g.tick()).sum();
        let compressed = self.compressor.process(sum * self.gain);
        compressed * self.fader.next_level()
    }

    fn set(&mut self, param: Param) {
        match param {
            Param::Gain(gain) => self.fader.set_gain(gain),
            other => {
                for input in &mut self.inputs {
                    input.set(other);
                }
            }
        }
    }

    fn release(&mut self) {
        self.fader.stop();
    }

    fn is_finished(&self) -> bool {
        self.fader.is_finished()
    }
}

/// What changed on the grid display after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    /// Column whose cells go back to their resting colors.
    pub released: usize,
    /// Column now playing.
    pub active: usize,
    /// Rows of the active column that sounded.
    pub rows: Vec<usize>,
}

/// Per-column voice slots.
#[derive(Debug, Default)]
pub struct ColumnVoices {
    slots: [Option<VoiceHandle>; GRID_SIZE],
}

impl ColumnVoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self, col: usize) -> bool {
        self.slots.get(col).is_some_and(|slot| slot.is_some())
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Fade out the previous column and start the current one.
    pub fn advance(
        &mut self,
        step: StepAdvance,
        grid: &Grid,
        factory: &mut InstrumentFactory,
        bus: &mut Bus,
        settings: &Settings,
    ) -> ColumnReport {
        if let Some(handle) = self.slots.get_mut(step.previous).and_then(Option::take) {
            handle.fade_out(bus);
        }

        let mut rows = Vec::new();
        let mut graphs = Vec::new();
        for (row, instrument) in grid.column(step.current) {
            match factory.build(instrument, row_frequency(row), settings) {
                Ok(graph) => {
                    rows.push(row);
                    graphs.push(graph);
                }
                Err(err @ Error::SampleUnavailable(_)) => {
                    log::debug!("Skipping {} at row {}: {}", instrument.name(), row, err);
                }
                Err(err) => {
                    log::warn!("Skipping {} at row {}: {}", instrument.name(), row, err);
                }
            }
        }

        // replaced, never reused
        if let Some(stale) = self.slots.get_mut(step.current).and_then(Option::take) {
            stale.stop(bus);
        }
        if let Some(mix) = ColumnMix::new(graphs, factory.sample_rate()) {
            log::debug!("Column {} playing {} voices", step.current, mix.len());
            if let Some(slot) = self.slots.get_mut(step.current) {
                *slot = Some(bus.play(Box::new(mix)));
            }
        }

        ColumnReport {
            released: step.previous,
            active: step.current,
            rows,
        }
    }

    /// Fade out every live column.
    pub fn fade_all(&mut self, bus: &Bus) {
        for handle in self.slots.iter_mut().filter_map(Option::take) {
            handle.fade_out(bus);
        }
    }

    /// Stop every live column now.
    pub fn stop_all(&mut self, bus: &Bus) {
        for handle in self.slots.iter_mut().filter_map(Option::take) {
            handle.stop(bus);
        }
    }
}
