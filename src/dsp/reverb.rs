/// Freeverb-style reverb: eight damped feedback combs in parallel followed
/// by four allpass diffusers.
///
/// Room size maps onto comb feedback; balance is the wet proportion of the
/// output. Both can be changed while running.
use super::{Effect, Param};

/// Comb delays in samples at 44.1 kHz.
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const ALLPASS_FEEDBACK: f32 = 0.5;
const DAMPING: f32 = 0.5;
const INPUT_GAIN: f32 = 0.015;

struct Comb {
    buffer: Vec<f32>,
    pos: usize,
    store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            pos: 0,
            store: 0.0,
        }
    }

    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let out = self.buffer[self.pos];
        self.store = out * (1.0 - DAMPING) + self.store * DAMPING;
        self.buffer[self.pos] = input + self.store * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }
}

struct Allpass {
    buffer: Vec<f32>,
    pos: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let out = delayed - input;
        self.buffer[self.pos] = input + delayed * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }
}

pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    feedback: f32,
    balance: f32,
}

impl Reverb {
    /// `size` and `balance` in `[0, 1]`.
    pub fn new(size: f32, balance: f32, sample_rate: f32) -> Self {
        let scale = sample_rate / 44100.0;
        let scaled = |n: usize| (n as f32 * scale) as usize;
        let mut reverb = Self {
            combs: COMB_TUNING.iter().map(|n| Comb::new(scaled(*n))).collect(),
            allpasses: ALLPASS_TUNING.iter().map(|n| Allpass::new(scaled(*n))).collect(),
            feedback: 0.0,
            balance: 0.0,
        };
        reverb.set_size(size);
        reverb.set_balance(balance);
        reverb
    }

    pub fn set_size(&mut self, size: f32) {
        self.feedback = 0.7 + size.clamp(0.0, 1.0) * 0.28;
    }

    pub fn set_balance(&mut self, balance: f32) {
        self.balance = balance.clamp(0.0, 1.0);
    }

    pub fn balance(&self) -> f32 {
        self.balance
    }
}

impl Effect for Reverb {
    fn process(&mut self, input: f32) -> f32 {
        let fed = input * INPUT_GAIN;
        let mut wet = 0.0;
        for comb in &mut self.combs {
            wet += comb.process(fed, self.feedback);
        }
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        input * (1.0 - self.balance) + wet * self.balance
    }

    fn set(&mut self, param: Param) {
        match param {
            Param::ReverbSize(size) => self.set_size(size),
            Param::ReverbBalance(balance) => self.set_balance(balance),
            _ => {}
        }
    }
}
