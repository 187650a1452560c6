/// Oscillators used by the instruments and the hue voice.
///
/// All oscillators keep a normalized phase in `[0, 1)` and accept
/// [`Param::Frequency`] so a running voice can be retuned.
use std::f32::consts::TAU;

use super::{Param, Signal};

#[derive(Debug, Clone, Copy)]
struct Phasor {
    phase: f32,
    increment: f32,
    sample_rate: f32,
}

impl Phasor {
    fn new(freq: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            increment: freq / sample_rate,
            sample_rate,
        }
    }

    fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase.rem_euclid(1.0);
        self
    }

    fn set_frequency(&mut self, freq: f32) {
        self.increment = freq / self.sample_rate;
    }

    /// Returns the phase before advancing.
    fn advance(&mut self) -> f32 {
        let current = self.phase;
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        current
    }
}

/// Polynomial band-limited step correction around a discontinuity at phase 0.
fn poly_blep(phase: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if phase < dt {
        let t = phase / dt;
        2.0 * t - t * t - 1.0
    } else if phase > 1.0 - dt {
        let t = (phase - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

pub struct Sine {
    phasor: Phasor,
}

impl Sine {
    pub fn new(freq: f32, sample_rate: f32) -> Self {
        Self {
            phasor: Phasor::new(freq, sample_rate),
        }
    }
}

impl Signal for Sine {
    fn tick(&mut self) -> f32 {
        (self.phasor.advance() * TAU).sin()
    }

    fn set(&mut self, param: Param) {
        if let Param::Frequency(freq) = param {
            self.phasor.set_frequency(freq);
        }
    }
}

/// Band-limited square wave swinging between -1 and 1.
pub struct Square {
    phasor: Phasor,
}

impl Square {
    pub fn new(freq: f32, sample_rate: f32) -> Self {
        Self {
            phasor: Phasor::new(freq, sample_rate),
        }
    }
}

impl Signal for Square {
    fn tick(&mut self) -> f32 {
        let dt = self.phasor.increment;
        let phase = self.phasor.advance();
        let naive = if phase < 0.5 { 1.0 } else { -1.0 };
        naive + poly_blep(phase, dt) - poly_blep((phase + 0.5).rem_euclid(1.0), dt)
    }

    fn set(&mut self, param: Param) {
        if let Param::Frequency(freq) = param {
            self.phasor.set_frequency(freq);
        }
    }
}

/// Relative detune of the seven saws of a super-saw, centre voice at 0.
const SUPER_SAW_OFFSETS: [f32; 7] = [
    -0.110_023_13,
    -0.062_884_39,
    -0.019_523_56,
    0.0,
    0.019_912_21,
    0.062_165_38,
    0.107_452_42,
];

/// Seven detuned saws, centre voice balanced against the side voices.
pub struct SuperSaw {
    voices: [Phasor; 7],
    base_freq: f32,
    detune: f32,
    centre_gain: f32,
    side_gain: f32,
}

impl SuperSaw {
    pub fn new(freq: f32, sample_rate: f32) -> Self {
        Self::with_params(freq, 0.5, 0.7, sample_rate)
    }

    /// `detune` and `balance` are both in `[0, 1]`; balance 0 is the centre
    /// saw alone, 1 is all seven at equal level.
    pub fn with_params(freq: f32, detune: f32, balance: f32, sample_rate: f32) -> Self {
        let balance = balance.clamp(0.0, 1.0);
        let mut voices = [Phasor::new(freq, sample_rate); 7];
        for (i, voice) in voices.iter_mut().enumerate() {
            // spread start phases
            *voice = voice.with_phase(i as f32 * 0.137);
        }
        let mut saw = Self {
            voices,
            base_freq: freq,
            detune: detune.clamp(0.0, 1.0),
            centre_gain: 1.0 - 0.5 * balance,
            side_gain: balance * 0.5,
        };
        saw.retune(freq);
        saw
    }

    fn retune(&mut self, freq: f32) {
        self.base_freq = freq;
        for (voice, offset) in self.voices.iter_mut().zip(SUPER_SAW_OFFSETS) {
            voice.set_frequency(freq * (1.0 + offset * self.detune));
        }
    }
}

impl Signal for SuperSaw {
    fn tick(&mut self) -> f32 {
        let mut out = 0.0;
        for (i, voice) in self.voices.iter_mut().enumerate() {
            let dt = voice.increment;
            let phase = voice.advance();
            let saw = 2.0 * phase - 1.0 - poly_blep(phase, dt);
            out += if i == 3 {
                saw * self.centre_gain
            } else {
                saw * self.side_gain / 3.0
            };
        }
        out
    }

    fn set(&mut self, param: Param) {
        if let Param::Frequency(freq) = param {
            self.retune(freq);
        }
    }
}

/// Waveform of a capacitor charging and discharging through a resistor.
///
/// `sharpness` 0 gives a triangle, 1 gives near-square edges with
/// exponential corners.
pub struct RcOscillator {
    phasor: Phasor,
    steepness: f32,
    norm: f32,
}

impl RcOscillator {
    pub fn new(freq: f32, sharpness: f32, sample_rate: f32) -> Self {
        let steepness = 1.0 + sharpness.clamp(0.0, 1.0) * 9.0;
        Self {
            phasor: Phasor::new(freq, sample_rate),
            steepness,
            norm: 1.0 - (-steepness).exp(),
        }
    }

    fn shape(&self, phase: f32) -> f32 {
        let k = self.steepness;
        let level = if phase < 0.5 {
            (1.0 - (-k * phase * 2.0).exp()) / self.norm
        } else {
            ((-k * (phase - 0.5) * 2.0).exp() - (-k).exp()) / self.norm
        };
        level * 2.0 - 1.0
    }
}

impl Signal for RcOscillator {
    fn tick(&mut self) -> f32 {
        let phase = self.phasor.advance();
        self.shape(phase)
    }

    fn set(&mut self, param: Param) {
        if let Param::Frequency(freq) = param {
            self.phasor.set_frequency(freq);
        }
    }
}

/// Two-operator FM: a sine modulator at `carrier * ratio` modulating the
/// carrier's phase with the given index.
pub struct FmOscillator {
    carrier: Phasor,
    modulator: Phasor,
    ratio: f32,
    index: f32,
}

impl FmOscillator {
    pub fn new(carrier_freq: f32, ratio: f32, index: f32, sample_rate: f32) -> Self {
        Self {
            carrier: Phasor::new(carrier_freq, sample_rate),
            modulator: Phasor::new(carrier_freq * ratio, sample_rate),
            ratio,
            index,
        }
    }
}

impl Signal for FmOscillator {
    fn tick(&mut self) -> f32 {
        let m = (self.modulator.advance() * TAU).sin();
        let c = self.carrier.advance();
        (c * TAU + self.index * m).sin()
    }

    fn set(&mut self, param: Param) {
        if let Param::Frequency(freq) = param {
            self.carrier.set_frequency(freq);
            self.modulator.set_frequency(freq * self.ratio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::test_util::{peak, render, SR};

    fn zero_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|w| w[0] < 0.0 && w[1] >= 0.0)
            .count()
    }

    #[test]
    fn test_sine_frequency() {
        let mut sine = Sine::new(441.0, SR);
        let out = render(&mut sine, SR as usize);
        let crossings = zero_crossings(&out);
        assert!((440..=442).contains(&crossings), "crossings: {}", crossings);
        assert!(peak(&out) <= 1.0);
    }

    #[test]
    fn test_sine_retune() {
        let mut sine = Sine::new(100.0, SR);
        sine.set(Param::Frequency(1000.0));
        let out = render(&mut sine, SR as usize);
        let crossings = zero_crossings(&out);
        assert!((999..=1001).contains(&crossings), "crossings: {}", crossings);
    }

    #[test]
    fn test_square_is_bipolar() {
        let mut square = Square::new(100.0, SR);
        let out = render(&mut square, 4410);
        let high = out.iter().filter(|s| **s > 0.9).count();
        let low = out.iter().filter(|s| **s < -0.9).count();
        assert!(high > 1800 && low > 1800);
    }

    #[test]
    fn test_super_saw_bounded() {
        let mut saw = SuperSaw::new(220.0, SR);
        let out = render(&mut saw, 8192);
        assert!(peak(&out) < 2.0);
        assert!(peak(&out) > 0.1);
    }

    #[test]
    fn test_rc_oscillator_range() {
        let mut rc = RcOscillator::new(220.0, 0.8, SR);
        let out = render(&mut rc, 4096);
        assert!(out.iter().all(|s| (-1.001..=1.001).contains(s)));
        assert!(peak(&out) > 0.9);
    }

    #[test]
    fn test_fm_without_index_is_sine() {
        let mut fm = FmOscillator::new(300.0, 1.5, 0.0, SR);
        let mut sine = Sine::new(300.0, SR);
        for _ in 0..256 {
            assert!((fm.tick() - sine.tick()).abs() < 1e-4);
        }
    }
}
