/// Multi-tap chorus: three LFO-modulated delay taps over one shared line
/// with feedback, mixed against the dry signal.
use std::f32::consts::TAU;

use super::Effect;

const TAPS: usize = 3;
const BASE_DELAY_SECS: f32 = 0.012;
/// Modulation swing in seconds at depth 1.0.
const MAX_SWING_SECS: f32 = 0.004;
const LFO_RATES: [f32; TAPS] = [0.31, 0.43, 0.57];

pub struct Chorus {
    buffer: Vec<f32>,
    write_pos: usize,
    phases: [f32; TAPS],
    increments: [f32; TAPS],
    base_delay: f32,
    swing: f32,
    feedback: f32,
    balance: f32,
}

impl Chorus {
    /// `depth` in `[0, 5]`, `feedback` in `[0, 1)`, `balance` is the wet
    /// proportion in `[0, 1]`.
    pub fn new(depth: f32, feedback: f32, balance: f32, sample_rate: f32) -> Self {
        let depth = depth.clamp(0.0, 5.0);
        let base_delay = BASE_DELAY_SECS * sample_rate;
        let swing = MAX_SWING_SECS * depth * sample_rate;
        let len = (base_delay + swing) as usize + 4;
        let mut increments = [0.0; TAPS];
        for (inc, rate) in increments.iter_mut().zip(LFO_RATES) {
            *inc = rate / sample_rate;
        }
        Self {
            buffer: vec![0.0; len],
            write_pos: 0,
            phases: [0.0, 1.0 / 3.0, 2.0 / 3.0],
            increments,
            base_delay,
            swing,
            feedback: feedback.clamp(0.0, 0.95),
            balance: balance.clamp(0.0, 1.0),
        }
    }

    fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let pos = (self.write_pos as f32 + len as f32 - delay_samples).rem_euclid(len as f32);
        let index = pos as usize % len;
        let frac = pos - pos.floor();
        let a = self.buffer[index];
        let b = self.buffer[(index + 1) % len];
        a + (b - a) * frac
    }
}

impl Effect for Chorus {
    fn process(&mut self, input: f32) -> f32 {
        let mut wet = 0.0;
        for tap in 0..TAPS {
            let lfo = (self.phases[tap] * TAU).sin() * 0.5 + 0.5;
            wet += self.read(self.base_delay + self.swing * lfo);
            self.phases[tap] = (self.phases[tap] + self.increments[tap]).fract();
        }
        wet /= TAPS as f32;

        self.buffer[self.write_pos] = input + wet * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        input * (1.0 - self.balance) + wet * self.balance
    }
}
