/// The hue voice: a sine on the aux send whose pitch follows the tracker.
///
/// The oscillator and its effect return are started together when a hue is
/// first detected and torn down together (return first) when it is lost.
/// Pitch is smoothed on every frame but only pushed to the oscillator on
/// every fifth one; volume and reverb follow every frame.
use crate::audio::{Bus, VoiceHandle};
use crate::dsp::chorus::Chorus;
use crate::dsp::dynamics::Compressor;
use crate::dsp::oscillator::Sine;
use crate::dsp::reverb::Reverb;
use crate::dsp::{Amp, EffectChain, Param};
use crate::settings::HueSettings;

pub const INITIAL_FREQUENCY: f32 = 220.0;
pub const SMOOTHING: f32 = 0.1;
/// Pitch reaches the oscillator once every this many frames.
pub const FREQUENCY_UPDATE_FRAMES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneState {
    Inactive,
    Active,
}

#[derive(Debug)]
struct HueVoice {
    oscillator: VoiceHandle,
    effects: VoiceHandle,
}

#[derive(Debug)]
pub struct ToneController {
    sample_rate: f32,
    current_frequency: f32,
    target_frequency: f32,
    frame_counter: u32,
    voice: Option<HueVoice>,
}

impl ToneController {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            current_frequency: INITIAL_FREQUENCY,
            target_frequency: INITIAL_FREQUENCY,
            frame_counter: 0,
            voice: None,
        }
    }

    pub fn state(&self) -> ToneState {
        if self.voice.is_some() {
            ToneState::Active
        } else {
            ToneState::Inactive
        }
    }

    pub fn current_frequency(&self) -> f32 {
        self.current_frequency
    }

    pub fn target_frequency(&self) -> f32 {
        self.target_frequency
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    /// Feed one processed frame's detection (a quantized frequency) in.
    /// Every frame counts toward the pitch update cadence while tracking is
    /// enabled, detected or not.
    pub fn on_frame(&mut self, detection: Option<f32>, settings: &HueSettings, bus: &mut Bus) {
        if settings.enabled {
            self.frame_counter = (self.frame_counter + 1) % FREQUENCY_UPDATE_FRAMES;
        }

        let target = match detection {
            Some(freq) if settings.enabled => freq,
            _ => {
                self.teardown(bus);
                return;
            }
        };

        self.target_frequency = target;

        let Some(voice) = &self.voice else {
            self.current_frequency = target;
            self.voice = Some(self.build(settings, bus));
            log::info!("Hue voice started at {:.2} Hz", target);
            return;
        };

        self.current_frequency += (target - self.current_frequency) * SMOOTHING;
        if self.frame_counter % FREQUENCY_UPDATE_FRAMES == 0 {
            voice
                .oscillator
                .set(bus, Param::Frequency(self.current_frequency));
        }
        voice.oscillator.set(bus, Param::Gain(settings.volume));
        voice.effects.set(bus, Param::ReverbSize(settings.reverb));
        voice.effects.set(bus, Param::ReverbBalance(settings.reverb));
    }

    fn build(&self, settings: &HueSettings, bus: &mut Bus) -> HueVoice {
        let sr = self.sample_rate;
        let oscillator = Amp::new(
            Box::new(Sine::new(self.current_frequency, sr)),
            settings.volume,
        );
        let effects = EffectChain::new(vec![
            Box::new(Chorus::new(0.5, 0.25, 0.2, sr)),
            Box::new(Compressor::new(-10.0, 4.0, 0.01, 0.1, sr)),
            Box::new(Reverb::new(settings.reverb, settings.reverb, sr)),
        ]);
        HueVoice {
            oscillator: bus.play_to_send(Box::new(oscillator)),
            effects: bus.play_return(Box::new(effects)),
        }
    }

    /// Stop the reverb return, then the oscillator. No-op when inactive.
    fn teardown(&mut self, bus: &Bus) {
        if let Some(voice) = self.voice.take() {
            voice.effects.stop(bus);
            voice.oscillator.stop(bus);
            log::info!("Hue voice stopped");
        }
    }

    pub fn shutdown(&mut self, bus: &Bus) {
        self.teardown(bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Command, MixerLink, Route, Voice};

    const SR: f32 = 44100.0;

    fn drain(link: &MixerLink) -> Vec<Command> {
        link.commands.try_iter().collect()
    }

    #[test]
    fn test_activation_starts_send_and_return() {
        let (mut bus, link) = Bus::new(64);
        let mut tone = ToneController::new(SR);
        tone.on_frame(Some(440.0), &HueSettings::default(), &mut bus);
        assert_eq!(tone.state(), ToneState::Active);
        assert_eq!(tone.current_frequency(), 440.0);

        let commands = drain(&link);
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            commands[0],
            Command::Start { voice: Voice::Source { route: Route::Send, .. }, .. }
        ));
        assert!(matches!(commands[1], Command::Start { voice: Voice::Return { .. }, .. }));
    }

    #[test]
    fn test_smoothing_step() {
        let (mut bus, _link) = Bus::new(64);
        let mut tone = ToneController::new(SR);
        let settings = HueSettings::default();
        tone.on_frame(Some(220.0), &settings, &mut bus);
        assert_eq!(tone.current_frequency(), 220.0);
        tone.on_frame(Some(440.0), &settings, &mut bus);
        assert!((tone.current_frequency() - 242.0).abs() < 1e-3);
        assert_eq!(tone.target_frequency(), 440.0);
    }

    #[test]
    fn test_frequency_applied_every_fifth_frame() {
        let (mut bus, link) = Bus::new(256);
        let mut tone = ToneController::new(SR);
        let settings = HueSettings::default();
        tone.on_frame(Some(220.0), &settings, &mut bus);
        drain(&link);

        let mut frequency_updates = 0;
        let mut gain_updates = 0;
        let mut reverb_updates = 0;
        for _ in 0..10 {
            tone.on_frame(Some(440.0), &settings, &mut bus);
            for command in drain(&link) {
                match command {
                    Command::Set { param: Param::Frequency(_), .. } => frequency_updates += 1,
                    Command::Set { param: Param::Gain(_), .. } => gain_updates += 1,
                    Command::Set { param: Param::ReverbSize(_), .. } => reverb_updates += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(frequency_updates, 2);
        assert_eq!(gain_updates, 10);
        assert_eq!(reverb_updates, 10);
    }

    #[test]
    fn test_loss_tears_down_return_then_oscillator_once() {
        let (mut bus, link) = Bus::new(64);
        let mut tone = ToneController::new(SR);
        let settings = HueSettings::default();
        tone.on_frame(Some(329.63), &settings, &mut bus);
        let started = drain(&link);
        let (Command::Start { id: osc, .. }, Command::Start { id: ret, .. }) =
            (&started[0], &started[1])
        else {
            panic!("expected two starts");
        };
        let (osc, ret) = (*osc, *ret);

        let disabled = HueSettings {
            enabled: false,
            ..settings
        };
        tone.on_frame(Some(329.63), &disabled, &mut bus);
        assert_eq!(tone.state(), ToneState::Inactive);
        tone.on_frame(None, &settings, &mut bus);
        tone.shutdown(&bus);

        let commands = drain(&link);
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], Command::Stop { id } if id == ret));
        assert!(matches!(commands[1], Command::Stop { id } if id == osc));
    }

    #[test]
    fn test_undetected_frames_advance_counter() {
        let (mut bus, link) = Bus::new(64);
        let mut tone = ToneController::new(SR);
        let settings = HueSettings::default();
        tone.on_frame(Some(220.0), &settings, &mut bus);
        assert_eq!(tone.frame_counter(), 1);
        tone.on_frame(None, &settings, &mut bus);
        tone.on_frame(None, &settings, &mut bus);
        assert_eq!(tone.frame_counter(), 3);

        let disabled = HueSettings {
            enabled: false,
            ..settings
        };
        tone.on_frame(None, &disabled, &mut bus);
        assert_eq!(tone.frame_counter(), 3);

        // restart on 4, then the frame on 0 pushes the pitch
        tone.on_frame(Some(440.0), &settings, &mut bus);
        drain(&link);
        tone.on_frame(Some(440.0), &settings, &mut bus);
        assert_eq!(tone.frame_counter(), 0);
        assert!(drain(&link)
            .iter()
            .any(|c| matches!(c, Command::Set { param: Param::Frequency(_), .. })));
    }

    #[test]
    fn test_current_frequency_survives_teardown() {
        let (mut bus, _link) = Bus::new(64);
        let mut tone = ToneController::new(SR);
        let settings = HueSettings::default();
        tone.on_frame(Some(392.0), &settings, &mut bus);
        tone.on_frame(None, &settings, &mut bus);
        assert_eq!(tone.current_frequency(), 392.0);
    }
}
