/// Looping playback of a decoded sample.
use std::sync::Arc;

use super::Signal;

/// Decoded mono sample data, shared read-only between voices.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub frames: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleData {
    pub fn new(frames: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames.len() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Plays a sample in a loop, resampling linearly to the output rate.
pub struct SamplePlayer {
    data: Arc<SampleData>,
    position: f64,
    step: f64,
}

impl SamplePlayer {
    pub fn new(data: Arc<SampleData>, speed: f32, sample_rate: f32) -> Self {
        let step = speed as f64 * data.sample_rate as f64 / sample_rate as f64;
        Self {
            data,
            position: 0.0,
            step,
        }
    }
}

impl Signal for SamplePlayer {
    fn tick(&mut self) -> f32 {
        let frames = &self.data.frames;
        if frames.is_empty() {
            return 0.0;
        }
        let len = frames.len();
        let index = self.position as usize % len;
        let frac = (self.position - self.position.floor()) as f32;
        let a = frames[index];
        let b = frames[(index + 1) % len];

        self.position += self.step;
        if self.position >= len as f64 {
            self.position -= len as f64;
        }
        a + (b - a) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loops_at_native_rate() {
        let data = Arc::new(SampleData::new(vec![0.0, 0.5, 1.0], 44100));
        let mut player = SamplePlayer::new(data, 1.0, 44100.0);
        let out: Vec<f32> = (0..7).map(|_| player.tick()).collect();
        assert_eq!(out, vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_resamples_to_output_rate() {
        let data = Arc::new(SampleData::new(vec![0.0, 1.0, 0.0, -1.0], 22050));
        let mut player = SamplePlayer::new(data, 1.0, 44100.0);
        let out: Vec<f32> = (0..4).map(|_| player.tick()).collect();
        assert_eq!(out, vec![0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_empty_sample_is_silent() {
        let data = Arc::new(SampleData::new(Vec::new(), 44100));
        let mut player = SamplePlayer::new(data, 1.0, 44100.0);
        assert_eq!(player.tick(), 0.0);
        assert_eq!(player.data.duration_secs(), 0.0);
    }
}
