#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use huegrid::{
    level_to_unit, vision, AudioOutput, Bus, Engine, EngineConfig, Instrument, Metronome,
    PlaybackEvent, SampleChoice, Settings, TestPattern, FALLBACK_SAMPLE_RATE, GRID_SIZE,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 900.0])
            .with_title("HueGrid - Step Sequencer"),
        ..Default::default()
    };

    eframe::run_native(
        "HueGrid",
        options,
        Box::new(|_cc| Ok(Box::new(HueGridApp::new()))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
const CAMERA_WIDTH: usize = 640;
#[cfg(feature = "gui")]
const CAMERA_HEIGHT: usize = 360;

#[cfg(feature = "gui")]
struct HueGridApp {
    engine: Engine,
    metronome: Metronome,
    _audio_output: Option<AudioOutput>,
    settings: Settings,

    // UI state
    volume_level: u8,
    hue_volume_level: u8,
    hue_reverb_level: u8,
    held: [bool; Instrument::COUNT],
    previews: Option<[egui::TextureHandle; 3]>,
    status: Option<String>,
}

#[cfg(feature = "gui")]
impl HueGridApp {
    fn new() -> Self {
        let config = EngineConfig::default();
        let settings = Settings::default();

        let (bus, link) = Bus::new(config.command_capacity);
        let (audio_output, status) = match AudioOutput::start(link) {
            Ok(output) => (Some(output), None),
            Err(err) => {
                log::warn!("Running without audio: {}", err);
                (None, Some(format!("No audio output: {}", err)))
            }
        };
        let sample_rate = audio_output
            .as_ref()
            .map_or(FALLBACK_SAMPLE_RATE, AudioOutput::sample_rate);

        let camera = TestPattern::new(CAMERA_WIDTH, CAMERA_HEIGHT, settings.hue.target_hue);
        let engine = Engine::new(bus, sample_rate, &config).with_frame_source(Box::new(camera));

        Self {
            engine,
            metronome: Metronome::new(),
            _audio_output: audio_output,
            settings,
            volume_level: 5,
            hue_volume_level: 5,
            hue_reverb_level: 5,
            held: [false; Instrument::COUNT],
            previews: None,
            status,
        }
    }

    fn handle_playback_events(&mut self, ctx: &egui::Context) {
        let mut ticked = false;
        for event in self.metronome.poll_events() {
            match event {
                PlaybackEvent::Tick => {
                    if self.engine.on_tick(&self.settings).is_some() {
                        ticked = true;
                    }
                }
            }
        }
        self.engine.collect_retired();
        if ticked {
            self.update_previews(ctx);
        }
    }

    fn update_previews(&mut self, ctx: &egui::Context) {
        let Some(visuals) = self.engine.visuals() else {
            return;
        };
        let images = [
            color_image(&visuals.annotated),
            color_image(&visuals.edges.to_rgb()),
            color_image(&visuals.mask.to_rgb()),
        ];
        match self.previews.as_mut() {
            Some(textures) => {
                for (texture, image) in textures.iter_mut().zip(images) {
                    texture.set(image, egui::TextureOptions::LINEAR);
                }
            }
            None => {
                let [camera, edges, mask] = images;
                self.previews = Some([
                    ctx.load_texture("camera", camera, egui::TextureOptions::LINEAR),
                    ctx.load_texture("edges", edges, egui::TextureOptions::LINEAR),
                    ctx.load_texture("mask", mask, egui::TextureOptions::LINEAR),
                ]);
            }
        }
    }

    fn toggle_playback(&mut self) {
        if self.engine.toggle_play(&self.settings) {
            self.metronome.start(self.settings.tick_interval_ms());
        } else {
            self.metronome.stop();
        }
    }

    fn clear_all(&mut self) {
        self.metronome.stop();
        self.engine.clear_all();
        self.held = [false; Instrument::COUNT];
    }

    fn transport_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let label = if self.engine.is_playing() { "⏸ Pause" } else { "▶ Play" };
            if ui.button(label).clicked() {
                self.toggle_playback();
            }
            if ui.button("Clear All").clicked() {
                self.clear_all();
            }

            ui.add_space(20.0);

            ui.label("Volume:");
            if ui
                .add(egui::Slider::new(&mut self.volume_level, 0..=10))
                .changed()
            {
                self.settings.volume = level_to_unit(self.volume_level);
                self.engine.set_volume(self.settings.volume);
            }

            ui.label("Speed:");
            if ui
                .add(egui::Slider::new(&mut self.settings.speed, 1..=10))
                .changed()
            {
                let interval = self.engine.set_speed(self.settings.speed);
                self.metronome.set_interval_ms(interval);
            }
        });

        ui.horizontal(|ui| {
            ui.label("Sample:");
            egui::ComboBox::from_id_source("sample")
                .selected_text(self.settings.sample.file_name())
                .show_ui(ui, |ui| {
                    for choice in SampleChoice::ALL {
                        ui.selectable_value(&mut self.settings.sample, choice, choice.file_name());
                    }
                });

            ui.add_space(20.0);

            ui.checkbox(&mut self.settings.filter.enabled, "Low-pass");
            ui.add(
                egui::Slider::new(&mut self.settings.filter.frequency, 100.0..=3000.0)
                    .suffix(" Hz"),
            );
        });
    }

    fn grid_ui(&mut self, ui: &mut egui::Ui) {
        let playing_column = if self.engine.is_playing() {
            self.engine.playing_column()
        } else {
            None
        };

        egui::Grid::new("cells").spacing([4.0, 4.0]).show(ui, |ui| {
            for row in 0..GRID_SIZE {
                for col in 0..GRID_SIZE {
                    let grid = self.engine.grid();
                    let [r, g, b] = grid.color(row, col, playing_column);
                    let text_color = if r as u16 + g as u16 + b as u16 > 500 {
                        egui::Color32::BLACK
                    } else {
                        egui::Color32::WHITE
                    };
                    let button = egui::Button::new(
                        egui::RichText::new(grid.label(row, col)).color(text_color),
                    )
                    .min_size(egui::vec2(72.0, 40.0))
                    .fill(egui::Color32::from_rgb(r, g, b));

                    if ui.add(button).clicked() {
                        self.engine.toggle_cell(row, col, &self.settings);
                    }
                }
                ui.end_row();
            }
        });
    }

    fn hold_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Hold:");
            for instrument in Instrument::ALL {
                let [r, g, b] = instrument.color();
                let button = egui::Button::new(instrument.label())
                    .min_size(egui::vec2(80.0, 32.0))
                    .fill(egui::Color32::from_rgb(r, g, b));
                let down = ui.add(button).is_pointer_button_down_on();

                let slot = &mut self.held[instrument.index()];
                if down && !*slot {
                    *slot = true;
                    if let Err(err) = self.engine.hold_press(instrument, &self.settings) {
                        log::warn!("Hold {} failed: {}", instrument.name(), err);
                    }
                } else if !down && *slot {
                    *slot = false;
                    self.engine.hold_release(instrument);
                }
            }
        });
    }

    fn hue_ui(&mut self, ui: &mut egui::Ui) {
        let hue = &mut self.settings.hue;
        ui.checkbox(&mut hue.enabled, "Hue detection");
        ui.add(egui::Slider::new(&mut hue.target_hue, 0..=179).text("Hue"));
        ui.add(egui::Slider::new(&mut hue.sensitivity, 1..=10).text("Sensitivity"));
        if ui
            .add(egui::Slider::new(&mut self.hue_volume_level, 0..=10).text("Hue volume"))
            .changed()
        {
            hue.volume = level_to_unit(self.hue_volume_level);
        }
        if ui
            .add(egui::Slider::new(&mut self.hue_reverb_level, 0..=10).text("Hue reverb"))
            .changed()
        {
            hue.reverb = level_to_unit(self.hue_reverb_level);
        }

        match self.engine.last_sample() {
            Some(sample) => ui.label(format!(
                "Area {:.0} -> {:.2} Hz (voice at {:.2} Hz)",
                sample.area,
                sample.frequency,
                self.engine.tone().current_frequency()
            )),
            None => ui.label("No hue detected"),
        };

        ui.add_space(8.0);
        if let Some(textures) = &self.previews {
            let size = egui::vec2(vision::CANVAS_WIDTH as f32, vision::CANVAS_HEIGHT as f32);
            for texture in textures {
                ui.image(egui::load::SizedTexture::new(texture.id(), size));
            }
        }
    }
}

#[cfg(feature = "gui")]
fn color_image(frame: &vision::Frame) -> egui::ColorImage {
    egui::ColorImage::from_rgb([frame.width(), frame.height()], frame.data())
}

#[cfg(feature = "gui")]
impl eframe::App for HueGridApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events(ctx);

        egui::SidePanel::right("hue")
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("Hue voice");
                self.hue_ui(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("HueGrid - Step Sequencer");
            ui.add_space(10.0);

            self.transport_ui(ui);
            ui.add_space(10.0);
            self.grid_ui(ui);
            ui.add_space(10.0);
            self.hold_ui(ui);

            ui.separator();
            ui.label("Click a cell to cycle its instrument; hold a button to play it");
            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::YELLOW, format!("⚠ {}", status));
            }
        });
    }
}

#[cfg(feature = "gui")]
impl Drop for HueGridApp {
    fn drop(&mut self) {
        self.metronome.stop();
        self.engine.shutdown();
    }
}
