/// Delay-line pitch shifter.
///
/// Two read heads sweep through a short delay line at a rate set by the
/// transposition and are crossfaded with a triangular window so the jump at
/// the end of each sweep is inaudible.
use super::Effect;

pub struct PitchShifter {
    buffer: Vec<f32>,
    write_pos: usize,
    window: f32,
    /// Read head offset in samples, in `[0, window)`.
    offset: f32,
    /// Change of offset per sample: `1 - ratio`.
    drift: f32,
}

impl PitchShifter {
    /// `semitones` up (positive) or down; `window_secs` is the sweep length.
    pub fn new(semitones: f32, window_secs: f32, sample_rate: f32) -> Self {
        let window = (window_secs * sample_rate).max(16.0);
        let ratio = 2f32.powf(semitones / 12.0);
        Self {
            buffer: vec![0.0; window as usize + 4],
            write_pos: 0,
            window,
            offset: 0.0,
            drift: 1.0 - ratio,
        }
    }

    fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let pos = (self.write_pos as f32 + len as f32 - delay).rem_euclid(len as f32);
        let index = pos as usize % len;
        let frac = pos - pos.floor();
        let a = self.buffer[index];
        let b = self.buffer[(index + 1) % len];
        a + (b - a) * frac
    }
}

impl Effect for PitchShifter {
    fn process(&mut self, input: f32) -> f32 {
        self.buffer[self.write_pos] = input;

        let first = self.offset;
        let second = (self.offset + self.window * 0.5).rem_euclid(self.window);
        // triangular windows summing to one
        let gain_first = 1.0 - (2.0 * first / self.window - 1.0).abs();
        let gain_second = 1.0 - gain_first;
        let out = self.read(first) * gain_first + self.read(second) * gain_second;

        self.offset = (self.offset + self.drift).rem_euclid(self.window);
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        out
    }
}
