/// Feed-forward compressor with an attack/release smoothed gain computer.
///
/// ```text
/// level_db = 20 * log10(|x|)
/// target   = max(level_db - threshold, 0) * (1 - 1/ratio)
/// env      = follow(target)       attack when rising, release when falling
/// y        = x * 10^(-env / 20)
/// ```
use super::Effect;

#[derive(Debug, Clone)]
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    reduction_db: f32,
}

impl Compressor {
    /// Attack and release are in seconds.
    pub fn new(threshold_db: f32, ratio: f32, attack: f32, release: f32, sample_rate: f32) -> Self {
        Self {
            threshold_db,
            ratio: ratio.clamp(1.0, 100.0),
            attack_coeff: (-1.0 / (attack.max(1e-4) * sample_rate)).exp(),
            release_coeff: (-1.0 / (release.max(1e-3) * sample_rate)).exp(),
            reduction_db: 0.0,
        }
    }

    /// Current gain reduction in dB (positive means attenuating).
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }
}

impl Effect for Compressor {
    fn process(&mut self, input: f32) -> f32 {
        let level_db = 20.0 * input.abs().max(1e-10).log10();
        let over = level_db - self.threshold_db;
        let target = if over > 0.0 {
            over * (1.0 - 1.0 / self.ratio)
        } else {
            0.0
        };

        let coeff = if target > self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = coeff * self.reduction_db + (1.0 - coeff) * target;

        input * 10f32.powf(-self.reduction_db / 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::test_util::SR;

    #[test]
    fn test_quiet_signal_passes() {
        let mut comp = Compressor::new(-6.0, 20.0, 0.01, 0.1, SR);
        for _ in 0..1000 {
            let y = comp.process(0.1);
            assert!((y - 0.1).abs() < 1e-6);
        }
        assert_eq!(comp.reduction_db(), 0.0);
    }

    #[test]
    fn test_loud_signal_is_limited() {
        let mut comp = Compressor::new(-6.0, 20.0, 0.01, 0.1, SR);
        let mut y = 0.0;
        for _ in 0..44100 {
            y = comp.process(1.0);
        }
        // -6 dB threshold, 20:1 => output sits just above 0.5
        assert!(y > 0.5 && y < 0.56, "y: {}", y);
    }

    #[test]
    fn test_gain_recovers_after_release() {
        let mut comp = Compressor::new(-10.0, 4.0, 0.01, 0.1, SR);
        for _ in 0..4410 {
            comp.process(1.0);
        }
        assert!(comp.reduction_db() > 5.0);
        for _ in 0..44100 {
            comp.process(0.0);
        }
        assert!(comp.reduction_db() < 0.01);
    }
}
