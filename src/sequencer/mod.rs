/// Core sequencer logic - grid state and step clock
///
/// The grid is a fixed 10×10 matrix: rows pick the pitch from the scale,
/// columns are the steps of the cycle.
use crate::instrument::{Instrument, ACTIVE_COLOR, OFF_COLOR};
use crate::scale::row_frequency;

pub mod column;
pub mod hold;
pub mod playback;

/// Rows and columns in the grid.
pub const GRID_SIZE: usize = 10;

/// Tick interval for a speed level: `50 + (10 - level) * 20` ms, so level
/// 10 is 50 ms and level 1 is 230 ms. Levels outside 1–10 are clamped.
pub fn interval_for_speed(level: u8) -> u64 {
    let level = level.clamp(1, 10) as u64;
    50 + (10 - level) * 20
}

/// Label of a cell that is off, e.g. `A1` for row 0 column 0.
pub fn cell_name(row: usize, col: usize) -> String {
    format!("{}{}", (b'A' + row as u8) as char, col + 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: [[Option<Instrument>; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [[None; GRID_SIZE]; GRID_SIZE],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Instrument> {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .flatten()
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<Instrument>) {
        if let Some(r) = self.cells.get_mut(row) {
            if let Some(cell) = r.get_mut(col) {
                *cell = value;
            }
        }
    }

    /// Advance a cell to the next instrument, or to off after the last one.
    ///
    /// Returns the new assignment and the row's pitch.
    pub fn toggle(&mut self, row: usize, col: usize) -> (Option<Instrument>, f32) {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return (None, row_frequency(row));
        }
        let next = match self.cells[row][col] {
            None => Instrument::from_index(0),
            Some(current) => current.next(),
        };
        self.cells[row][col] = next;
        (next, row_frequency(row))
    }

    pub fn clear(&mut self) {
        self.cells = [[None; GRID_SIZE]; GRID_SIZE];
    }

    /// Rows of `col` that have an instrument, with the instrument.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (usize, Instrument)> + '_ {
        (0..GRID_SIZE).filter_map(move |row| self.get(row, col).map(|i| (row, i)))
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Button label for a cell.
    pub fn label(&self, row: usize, col: usize) -> String {
        match self.get(row, col) {
            Some(instrument) => instrument.label(),
            None => cell_name(row, col),
        }
    }

    /// Resting color for a cell, or the highlight when its column is playing.
    pub fn color(&self, row: usize, col: usize, playing_column: Option<usize>) -> [u8; 3] {
        match self.get(row, col) {
            Some(_) if playing_column == Some(col) => ACTIVE_COLOR,
            Some(instrument) => instrument.color(),
            None => OFF_COLOR,
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

/// Step indices reported by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepAdvance {
    pub previous: usize,
    pub current: usize,
}

/// Transport state and step position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepScheduler {
    playing: bool,
    step: usize,
    previous: Option<usize>,
    interval_ms: u64,
}

impl StepScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            playing: false,
            step: 0,
            previous: None,
            interval_ms,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn previous_step(&self) -> Option<usize> {
        self.previous
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn start(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
        self.playing = true;
    }

    /// Safe to call when already stopped.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn set_interval_ms(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    /// Back to step 0 with no previous step.
    pub fn reset(&mut self) {
        self.step = 0;
        self.previous = None;
    }

    /// Advance one step. Does nothing while stopped.
    pub fn tick(&mut self) -> Option<StepAdvance> {
        if !self.playing {
            return None;
        }
        let previous = self.step;
        self.step = (self.step + 1) % GRID_SIZE;
        self.previous = Some(previous);
        Some(StepAdvance {
            previous,
            current: self.step,
        })
    }
}

impl Default for StepScheduler {
    fn default() -> Self {
        Self::new(interval_for_speed(5))
    }
}
