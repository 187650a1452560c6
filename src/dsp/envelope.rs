/// Gain envelopes.
///
/// [`Fader`] is the anti-click ramp wrapped around every voice; [`Adsr`]
/// shapes the individual drum hits.
use super::{seconds_to_samples, Param, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaderStage {
    Idle,
    FadingIn,
    Holding,
    FadingOut,
    Done,
}

/// Linear fade-in / fade-out envelope scaled by a live gain.
///
/// The ramp position and the gain are independent, so a gain change
/// mid-fade does not restart the ramp.
#[derive(Debug, Clone)]
pub struct Fader {
    fade_in: usize,
    fade_out: usize,
    gain: f32,
    position: f32,
    fade_from: f32,
    elapsed: usize,
    stage: FaderStage,
}

impl Fader {
    pub fn new(fade_in_secs: f32, fade_out_secs: f32, gain: f32, sample_rate: f32) -> Self {
        Self {
            fade_in: seconds_to_samples(fade_in_secs, sample_rate),
            fade_out: seconds_to_samples(fade_out_secs, sample_rate),
            gain,
            position: 0.0,
            fade_from: 0.0,
            elapsed: 0,
            stage: FaderStage::Idle,
        }
    }

    /// Start the fade-in.
    pub fn play(mut self) -> Self {
        self.stage = FaderStage::FadingIn;
        self.elapsed = 0;
        self
    }

    /// Start the fade-out from wherever the ramp currently is.
    pub fn stop(&mut self) {
        match self.stage {
            FaderStage::FadingOut | FaderStage::Done => {}
            FaderStage::Idle => self.stage = FaderStage::Done,
            FaderStage::FadingIn | FaderStage::Holding => {
                self.stage = FaderStage::FadingOut;
                self.fade_from = self.position;
                self.elapsed = 0;
            }
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn stage(&self) -> FaderStage {
        self.stage
    }

    pub fn next_level(&mut self) -> f32 {
        match self.stage {
            FaderStage::Idle | FaderStage::Done => return 0.0,
            FaderStage::FadingIn => {
                self.elapsed += 1;
                self.position = self.elapsed as f32 / self.fade_in as f32;
                if self.elapsed >= self.fade_in {
                    self.position = 1.0;
                    self.stage = FaderStage::Holding;
                }
            }
            FaderStage::Holding => {}
            FaderStage::FadingOut => {
                self.elapsed += 1;
                let t = self.elapsed as f32 / self.fade_out as f32;
                self.position = self.fade_from * (1.0 - t);
                if self.elapsed >= self.fade_out {
                    self.position = 0.0;
                    self.stage = FaderStage::Done;
                }
            }
        }
        self.position * self.gain
    }
}

impl Signal for Fader {
    fn tick(&mut self) -> f32 {
        self.next_level()
    }

    fn set(&mut self, param: Param) {
        if let Param::Gain(gain) = param {
            self.set_gain(gain);
        }
    }

    fn release(&mut self) {
        self.stop();
    }

    fn is_finished(&self) -> bool {
        self.stage == FaderStage::Done
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdsrStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Done,
}

/// Attack / decay / sustain / release envelope, started on construction.
#[derive(Debug, Clone)]
pub struct Adsr {
    attack: usize,
    decay: usize,
    sustain: f32,
    release: usize,
    gain: f32,
    level: f32,
    release_from: f32,
    elapsed: usize,
    stage: AdsrStage,
}

impl Adsr {
    /// Times in seconds; `sustain` is a level in `[0, 1]`.
    pub fn new(
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
        gain: f32,
        sample_rate: f32,
    ) -> Self {
        Self {
            attack: seconds_to_samples(attack, sample_rate),
            decay: seconds_to_samples(decay, sample_rate),
            sustain: sustain.clamp(0.0, 1.0),
            release: seconds_to_samples(release, sample_rate),
            gain,
            level: 0.0,
            release_from: 0.0,
            elapsed: 0,
            stage: AdsrStage::Attack,
        }
    }
}

impl Signal for Adsr {
    fn tick(&mut self) -> f32 {
        match self.stage {
            AdsrStage::Attack => {
                self.elapsed += 1;
                self.level = self.elapsed as f32 / self.attack as f32;
                if self.elapsed >= self.attack {
                    self.level = 1.0;
                    self.elapsed = 0;
                    self.stage = AdsrStage::Decay;
                }
            }
            AdsrStage::Decay => {
                self.elapsed += 1;
                let t = self.elapsed as f32 / self.decay as f32;
                self.level = 1.0 + (self.sustain - 1.0) * t;
                if self.elapsed >= self.decay {
                    self.level = self.sustain;
                    self.stage = AdsrStage::Sustain;
                }
            }
            AdsrStage::Sustain => {}
            AdsrStage::Release => {
                self.elapsed += 1;
                let t = self.elapsed as f32 / self.release as f32;
                self.level = self.release_from * (1.0 - t);
                if self.elapsed >= self.release {
                    self.level = 0.0;
                    self.stage = AdsrStage::Done;
                }
            }
            AdsrStage::Done => return 0.0,
        }
        self.level * self.gain
    }

    fn release(&mut self) {
        if self.stage != AdsrStage::Done && self.stage != AdsrStage::Release {
            self.release_from = self.level;
            self.elapsed = 0;
            self.stage = AdsrStage::Release;
        }
    }

    fn is_finished(&self) -> bool {
        self.stage == AdsrStage::Done
            || (self.stage == AdsrStage::Sustain && self.sustain == 0.0)
    }
}
