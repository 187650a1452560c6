/// Control-thread orchestration.
///
/// [`Engine`] owns the grid, the step clock, every voice slot, the tracker
/// and the frame source. The UI calls it on button events and on every
/// metronome tick, passing the current [`Settings`].
use crate::audio::Bus;
use crate::dsp::{Param, Signal};
use crate::error::Result;
use crate::instrument::{Instrument, InstrumentFactory, InstrumentGraph};
use crate::sequencer::column::{ColumnReport, ColumnVoices};
use crate::sequencer::hold::HoldVoices;
use crate::sequencer::{interval_for_speed, Grid, StepScheduler, GRID_SIZE};
use crate::settings::{EngineConfig, Settings};
use crate::tone::ToneController;
use crate::vision::{FrameSource, HueSample, HueTracker, TrackerOutput, Visuals};

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub column: ColumnReport,
    pub hue: Option<HueSample>,
}

pub struct Engine {
    grid: Grid,
    scheduler: StepScheduler,
    factory: InstrumentFactory,
    bus: Bus,
    columns: ColumnVoices,
    holds: HoldVoices,
    previews: Vec<Option<InstrumentGraph>>,
    tracker: HueTracker,
    tone: ToneController,
    frames: Option<Box<dyn FrameSource>>,
    last_output: TrackerOutput,
    shut_down: bool,
}

impl Engine {
    pub fn new(bus: Bus, sample_rate: f32, config: &EngineConfig) -> Self {
        Self {
            grid: Grid::new(),
            scheduler: StepScheduler::default(),
            factory: InstrumentFactory::new(sample_rate, config),
            bus,
            columns: ColumnVoices::new(),
            holds: HoldVoices::new(),
            previews: (0..GRID_SIZE * GRID_SIZE).map(|_| None).collect(),
            tracker: HueTracker::new(),
            tone: ToneController::new(sample_rate),
            frames: None,
            last_output: TrackerOutput::default(),
            shut_down: false,
        }
    }

    pub fn with_frame_source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.frames = Some(source);
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn scheduler(&self) -> &StepScheduler {
        &self.scheduler
    }

    pub fn tone(&self) -> &ToneController {
        &self.tone
    }

    pub fn holds(&self) -> &HoldVoices {
        &self.holds
    }

    pub fn columns(&self) -> &ColumnVoices {
        &self.columns
    }

    pub fn factory(&self) -> &InstrumentFactory {
        &self.factory
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// The column to highlight, once playback has stepped at least once.
    pub fn playing_column(&self) -> Option<usize> {
        self.scheduler.previous_step()?;
        Some(self.scheduler.step())
    }

    pub fn visuals(&self) -> Option<&Visuals> {
        self.last_output.visuals.as_ref()
    }

    pub fn last_sample(&self) -> Option<&HueSample> {
        self.last_output.sample.as_ref()
    }

    pub fn has_preview(&self, row: usize, col: usize) -> bool {
        self.preview_index(row, col)
            .is_some_and(|i| self.previews[i].is_some())
    }

    fn preview_index(&self, row: usize, col: usize) -> Option<usize> {
        (row < GRID_SIZE && col < GRID_SIZE).then_some(row * GRID_SIZE + col)
    }

    /// Cycle a cell's instrument. The cell's preview graph is rebuilt for
    /// the new instrument, or dropped when the cell turns off. Previews are
    /// never routed to the output.
    pub fn toggle_cell(
        &mut self,
        row: usize,
        col: usize,
        settings: &Settings,
    ) -> Option<Instrument> {
        let Some(index) = self.preview_index(row, col) else {
            log::debug!("Ignoring toggle outside the grid at ({}, {})", row, col);
            return None;
        };
        let (instrument, freq) = self.grid.toggle(row, col);
        self.previews[index] = None;
        if let Some(instrument) = instrument {
            match self.factory.build(instrument, freq, settings) {
                Ok(graph) => self.previews[index] = Some(graph),
                Err(err) => log::debug!("No preview for {}: {}", instrument.name(), err),
            }
        }
        log::debug!(
            "Cell {} -> {}",
            crate::sequencer::cell_name(row, col),
            instrument.map_or("off", Instrument::name)
        );
        instrument
    }

    /// Start stepping at the speed in `settings`.
    pub fn play(&mut self, settings: &Settings) {
        if self.scheduler.is_playing() {
            return;
        }
        self.scheduler.start(settings.tick_interval_ms());
        log::info!("Playback started at {} ms per step", self.scheduler.interval_ms());
    }

    /// Stop stepping. Columns fade out; the hue voice and previews stop at
    /// once. Held instruments keep sounding.
    pub fn pause(&mut self) {
        if !self.scheduler.is_playing() {
            return;
        }
        self.scheduler.stop();
        self.tone.shutdown(&self.bus);
        self.columns.fade_all(&self.bus);
        self.drop_previews();
        log::info!("Playback paused at step {}", self.scheduler.step());
    }

    /// Returns whether playback is now running.
    pub fn toggle_play(&mut self, settings: &Settings) -> bool {
        if self.scheduler.is_playing() {
            self.pause();
        } else {
            self.play(settings);
        }
        self.scheduler.is_playing()
    }

    /// Turn every cell off and stop everything now. A running sequence is
    /// also stopped and rewound to step 0.
    pub fn clear_all(&mut self) {
        if self.scheduler.is_playing() {
            self.scheduler.stop();
            self.scheduler.reset();
            self.tone.shutdown(&self.bus);
        }
        self.columns.stop_all(&self.bus);
        self.holds.stop_all(&self.bus);
        self.drop_previews();
        self.grid.clear();
        log::info!("Grid cleared");
    }

    fn drop_previews(&mut self) {
        for preview in &mut self.previews {
            *preview = None;
        }
    }

    /// Apply a speed level. Returns the new tick interval in ms.
    pub fn set_speed(&mut self, level: u8) -> u64 {
        let interval = interval_for_speed(level);
        self.scheduler.set_interval_ms(interval);
        interval
    }

    /// Apply the master volume to previews and live holds.
    pub fn set_volume(&mut self, volume: f32) {
        for graph in self.previews.iter_mut().flatten() {
            graph.set(Param::Gain(volume));
        }
        self.holds.set_volume(volume, &self.bus);
    }

    pub fn hold_press(&mut self, instrument: Instrument, settings: &Settings) -> Result<()> {
        self.holds
            .press(instrument, &mut self.factory, &mut self.bus, settings)
    }

    pub fn hold_release(&mut self, instrument: Instrument) {
        self.holds.release(instrument, &self.bus);
    }

    /// Advance one step: read and track one frame, then swap the playing
    /// column. Does nothing while paused.
    pub fn on_tick(&mut self, settings: &Settings) -> Option<TickReport> {
        self.bus.collect_retired();
        let advance = self.scheduler.tick()?;

        self.process_frame(settings);
        let column = self.columns.advance(
            advance,
            &self.grid,
            &mut self.factory,
            &mut self.bus,
            settings,
        );
        Some(TickReport {
            column,
            hue: self.last_output.sample.clone(),
        })
    }

    /// Read one frame and update the hue voice from it.
    ///
    /// With detection disabled the hue voice is torn down and no frame is
    /// read. A failed read leaves the hue voice as it was.
    pub fn process_frame(&mut self, settings: &Settings) {
        if !settings.hue.enabled {
            self.tone.on_frame(None, &settings.hue, &mut self.bus);
            self.last_output = TrackerOutput::default();
            return;
        }
        let Some(source) = self.frames.as_mut() else {
            return;
        };
        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("Skipping frame: {}", err);
                return;
            }
        };

        let output = self.tracker.process(&frame, &settings.hue);
        let detection = output.sample.as_ref().map(|s| s.frequency);
        self.tone.on_frame(detection, &settings.hue, &mut self.bus);
        self.last_output = output;
    }

    /// Drop voices the mixer has finished with.
    pub fn collect_retired(&self) -> usize {
        self.bus.collect_retired()
    }

    /// Stop every voice and release the frame source. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.scheduler.stop();
        if let Some(mut source) = self.frames.take() {
            source.release();
        }
        self.tone.shutdown(&self.bus);
        self.columns.stop_all(&self.bus);
        self.holds.stop_all(&self.bus);
        self.drop_previews();
        log::info!("Engine shut down");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::audio::{Command, MixerLink, Route, Voice};
    use crate::error::Error;
    use crate::settings::HueSettings;
    use crate::vision::frame::{hsv_to_rgb, BoundingBox, Frame};
    use crate::vision::{CANVAS_HEIGHT, CANVAS_WIDTH};

    const SR: f32 = 44100.0;

    /// Hands out a fixed frame, or fails, and counts releases.
    struct ScriptedSource {
        frame: Option<Frame>,
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for ScriptedSource {
        fn read_frame(&mut self) -> Result<Frame> {
            self.frame
                .clone()
                .ok_or_else(|| Error::Capture("no frame".to_string()))
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn green_patch() -> Frame {
        let mut frame = Frame::filled(CANVAS_WIDTH, CANVAS_HEIGHT, [0, 0, 0]);
        frame.fill_rect(
            BoundingBox { x: 100, y: 50, width: 10, height: 10 },
            hsv_to_rgb([50, 255, 255]),
        );
        frame
    }

    fn engine_with(frame: Option<Frame>) -> (Engine, MixerLink, Arc<AtomicUsize>) {
        let (bus, link) = Bus::new(256);
        let config = EngineConfig {
            sample_dir: std::env::temp_dir().join("huegrid-engine-no-samples"),
            ..EngineConfig::default()
        };
        let releases = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource {
            frame,
            releases: Arc::clone(&releases),
        };
        let engine = Engine::new(bus, SR, &config).with_frame_source(Box::new(source));
        (engine, link, releases)
    }

    fn drain(link: &MixerLink) -> Vec<Command> {
        link.commands.try_iter().collect()
    }

    fn main_starts(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Command::Start {
                        voice: Voice::Source { route: Route::Main, .. },
                        ..
                    }
                )
            })
            .count()
    }

    #[test]
    fn test_single_sine_cell_plays_once_per_cycle() {
        let (mut engine, link, _) = engine_with(None);
        let settings = Settings::default();
        assert_eq!(engine.toggle_cell(0, 0, &settings), Some(Instrument::Sine));
        assert!(engine.has_preview(0, 0));
        // previews are not routed
        assert!(drain(&link).is_empty());

        assert!(engine.on_tick(&settings).is_none());
        engine.play(&settings);
        assert_eq!(engine.scheduler().interval_ms(), 150);

        let mut starts_per_step = [0; GRID_SIZE];
        let mut steps = Vec::new();
        for _ in 0..GRID_SIZE {
            let report = engine.on_tick(&settings).unwrap();
            steps.push(report.column.active);
            starts_per_step[report.column.active] += main_starts(&drain(&link));
        }
        assert_eq!(steps, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);
        assert_eq!(starts_per_step, [1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(engine.columns().is_live(0));

        let report = engine.on_tick(&settings).unwrap();
        assert_eq!(report.column.released, 0);
        assert!(matches!(drain(&link).as_slice(), [Command::Release { .. }]));
    }

    #[test]
    fn test_pause_fades_columns_and_stops_hue() {
        let (mut engine, link, _) = engine_with(Some(green_patch()));
        let settings = Settings::default();
        engine.toggle_cell(3, 1, &settings);
        engine.play(&settings);
        let report = engine.on_tick(&settings).unwrap();
        assert!(report.hue.is_some());
        assert_eq!(engine.tone().state(), crate::tone::ToneState::Active);
        drain(&link);

        assert!(!engine.toggle_play(&settings));
        let commands = drain(&link);
        assert_eq!(commands.iter().filter(|c| matches!(c, Command::Stop { .. })).count(), 2);
        assert_eq!(commands.iter().filter(|c| matches!(c, Command::Release { .. })).count(), 1);
        assert!(!engine.has_preview(3, 1));
        assert_eq!(engine.grid().get(3, 1), Some(Instrument::Sine));
        assert!(engine.on_tick(&settings).is_none());
    }

    #[test]
    fn test_pause_keeps_held_instruments() {
        let (mut engine, link, _) = engine_with(None);
        let settings = Settings::default();
        engine.hold_press(Instrument::Sine, &settings).unwrap();
        engine.play(&settings);
        engine.on_tick(&settings);
        drain(&link);

        engine.pause();
        assert!(!engine.is_playing());
        assert!(drain(&link).is_empty());
        assert!(engine.holds().is_held(Instrument::Sine));

        engine.hold_release(Instrument::Sine);
        assert!(matches!(drain(&link).as_slice(), [Command::Stop { .. }]));
    }

    #[test]
    fn test_disabling_hue_tears_down_once() {
        let (mut engine, link, _) = engine_with(Some(green_patch()));
        let mut settings = Settings::default();
        engine.play(&settings);
        engine.on_tick(&settings);
        let started = drain(&link);
        let ids: Vec<_> = started
            .iter()
            .filter_map(|c| match c {
                Command::Start { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);

        settings.hue = HueSettings {
            enabled: false,
            ..settings.hue
        };
        engine.on_tick(&settings);
        engine.on_tick(&settings);
        let commands = drain(&link);
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], Command::Stop { id } if id == ids[1]));
        assert!(matches!(commands[1], Command::Stop { id } if id == ids[0]));
        assert!(engine.visuals().is_none());
    }

    #[test]
    fn test_failed_read_keeps_tone() {
        let (mut engine, link, _) = engine_with(None);
        let settings = Settings::default();
        engine.play(&settings);
        engine.on_tick(&settings);
        assert!(drain(&link).is_empty());
        assert!(engine.last_sample().is_none());
    }

    #[test]
    fn test_clear_all_stops_now_and_rewinds() {
        let (mut engine, link, _) = engine_with(None);
        let settings = Settings::default();
        engine.toggle_cell(0, 1, &settings);
        engine.hold_press(Instrument::Saw, &settings).unwrap();
        engine.play(&settings);
        engine.on_tick(&settings);
        drain(&link);

        engine.clear_all();
        let commands = drain(&link);
        assert_eq!(commands.len(), 2);
        assert!(commands.iter().all(|c| matches!(c, Command::Stop { .. })));
        assert!(!engine.is_playing());
        assert_eq!(engine.scheduler().step(), 0);
        assert_eq!(engine.playing_column(), None);
        assert_eq!(engine.grid().active_count(), 0);
        assert!(!engine.has_preview(0, 1));
    }

    #[test]
    fn test_toggle_off_drops_preview() {
        let (mut engine, _link, _) = engine_with(None);
        let settings = Settings::default();
        for _ in 0..Instrument::COUNT {
            engine.toggle_cell(2, 2, &settings);
        }
        assert_eq!(engine.grid().get(2, 2), Some(Instrument::Drumkit));
        assert!(engine.has_preview(2, 2));
        assert_eq!(engine.toggle_cell(2, 2, &settings), None);
        assert!(!engine.has_preview(2, 2));
        assert_eq!(engine.toggle_cell(11, 2, &settings), None);
    }

    #[test]
    fn test_holds_and_volume() {
        let (mut engine, link, _) = engine_with(None);
        let settings = Settings::default();
        engine.hold_press(Instrument::Square, &settings).unwrap();
        engine.hold_press(Instrument::Square, &settings).unwrap();
        assert_eq!(main_starts(&drain(&link)), 1);

        engine.set_volume(0.9);
        assert!(matches!(
            drain(&link).as_slice(),
            [Command::Set { param: Param::Gain(_), .. }]
        ));
        engine.hold_release(Instrument::Square);
        assert!(matches!(drain(&link).as_slice(), [Command::Stop { .. }]));
        assert!(!engine.holds().is_held(Instrument::Square));
    }

    #[test]
    fn test_speed_change_applies_immediately() {
        let (mut engine, _link, _) = engine_with(None);
        engine.play(&Settings::default());
        assert_eq!(engine.set_speed(10), 50);
        assert_eq!(engine.scheduler().interval_ms(), 50);
        assert_eq!(engine.set_speed(1), 230);
        assert_eq!(engine.set_speed(5), 150);
        assert_eq!(engine.scheduler().interval_ms(), 150);
    }

    #[test]
    fn test_shutdown_releases_source_once() {
        let (mut engine, link, releases) = engine_with(Some(green_patch()));
        let settings = Settings::default();
        engine.play(&settings);
        engine.on_tick(&settings);
        drain(&link);

        engine.shutdown();
        engine.shutdown();
        drop(engine);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(drain(&link).len(), 2);
    }
}
