/// Pink noise (1/f spectrum) using the Voss-McCartney algorithm.
///
/// Seven octave rows are refreshed at rates set by the bit pattern of a
/// running counter; their average has equal energy per octave.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Signal;

const OCTAVES: usize = 7;

pub struct PinkNoise {
    rng: StdRng,
    rows: [f32; OCTAVES],
    counter: u32,
}

impl PinkNoise {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let mut rows = [0.0; OCTAVES];
        for row in &mut rows {
            *row = rng.gen::<f32>() * 2.0 - 1.0;
        }
        Self {
            rng,
            rows,
            counter: 0,
        }
    }
}

impl Default for PinkNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal for PinkNoise {
    fn tick(&mut self) -> f32 {
        let mut sum = 0.0;
        for (octave, row) in self.rows.iter_mut().enumerate() {
            if self.counter & (1 << octave) == 0 {
                *row = self.rng.gen::<f32>() * 2.0 - 1.0;
            }
            sum += *row;
        }
        self.counter = self.counter.wrapping_add(1);
        sum / OCTAVES as f32
    }
}
