/// Sample-by-sample signal building blocks.
///
/// Everything here is constructed on the control thread and then moved to
/// the audio thread inside a voice. `tick`/`process` never allocate.
pub mod chorus;
pub mod dynamics;
pub mod envelope;
pub mod filter;
pub mod noise;
pub mod oscillator;
pub mod pitch_shift;
pub mod reverb;
pub mod sampler;

/// A parameter update addressed to a running voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Frequency(f32),
    Gain(f32),
    ReverbSize(f32),
    ReverbBalance(f32),
}

/// A source of samples.
pub trait Signal: Send {
    /// Produce the next sample.
    fn tick(&mut self) -> f32;

    /// Apply a parameter update. Sources ignore what they don't understand.
    fn set(&mut self, _param: Param) {}

    /// Start the release stage of whatever envelope owns this signal.
    fn release(&mut self) {}

    /// True once the signal will only ever produce silence.
    fn is_finished(&self) -> bool {
        false
    }
}

/// A processor that transforms one input sample into one output sample.
pub trait Effect: Send {
    fn process(&mut self, input: f32) -> f32;

    fn set(&mut self, _param: Param) {}
}

/// Sum of several signals.
pub struct Sum {
    parts: Vec<Box<dyn Signal>>,
}

impl Sum {
    pub fn new(parts: Vec<Box<dyn Signal>>) -> Self {
        Self { parts }
    }
}

impl Signal for Sum {
    fn tick(&mut self) -> f32 {
        self.parts.iter_mut().map(|p| p.tick()).sum()
    }

    fn set(&mut self, param: Param) {
        for part in &mut self.parts {
            part.set(param);
        }
    }
}

/// A signal multiplied by a constant.
pub struct Scaled {
    inner: Box<dyn Signal>,
    gain: f32,
}

impl Scaled {
    pub fn new(inner: Box<dyn Signal>, gain: f32) -> Self {
        Self { inner, gain }
    }
}

impl Signal for Scaled {
    fn tick(&mut self) -> f32 {
        self.inner.tick() * self.gain
    }

    fn set(&mut self, param: Param) {
        self.inner.set(param);
    }
}

/// A signal under a gain that follows [`Param::Gain`].
pub struct Amp {
    inner: Box<dyn Signal>,
    gain: f32,
}

impl Amp {
    pub fn new(inner: Box<dyn Signal>, gain: f32) -> Self {
        Self { inner, gain }
    }
}

impl Signal for Amp {
    fn tick(&mut self) -> f32 {
        self.inner.tick() * self.gain
    }

    fn set(&mut self, param: Param) {
        match param {
            Param::Gain(gain) => self.gain = gain,
            other => self.inner.set(other),
        }
    }
}

/// Ring product of two signals, typically an oscillator and an envelope.
pub struct Product {
    left: Box<dyn Signal>,
    right: Box<dyn Signal>,
}

impl Product {
    pub fn new(left: Box<dyn Signal>, right: Box<dyn Signal>) -> Self {
        Self { left, right }
    }
}

impl Signal for Product {
    fn tick(&mut self) -> f32 {
        self.left.tick() * self.right.tick()
    }

    fn set(&mut self, param: Param) {
        self.left.set(param);
        self.right.set(param);
    }

    fn release(&mut self) {
        self.left.release();
        self.right.release();
    }
}

/// A signal routed through an effect.
pub struct Processed {
    source: Box<dyn Signal>,
    effect: Box<dyn Effect>,
}

impl Processed {
    pub fn new(source: Box<dyn Signal>, effect: Box<dyn Effect>) -> Self {
        Self { source, effect }
    }
}

impl Signal for Processed {
    fn tick(&mut self) -> f32 {
        let x = self.source.tick();
        self.effect.process(x)
    }

    fn set(&mut self, param: Param) {
        self.source.set(param);
        self.effect.set(param);
    }

    fn release(&mut self) {
        self.source.release();
    }

    fn is_finished(&self) -> bool {
        self.source.is_finished()
    }
}

/// Effects applied one after another.
pub struct EffectChain {
    stages: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    pub fn new(stages: Vec<Box<dyn Effect>>) -> Self {
        Self { stages }
    }
}

impl Effect for EffectChain {
    fn process(&mut self, input: f32) -> f32 {
        self.stages.iter_mut().fold(input, |x, stage| stage.process(x))
    }

    fn set(&mut self, param: Param) {
        for stage in &mut self.stages {
            stage.set(param);
        }
    }
}

/// Convert a duration in seconds to a whole number of samples (at least 1).
pub(crate) fn seconds_to_samples(seconds: f32, sample_rate: f32) -> usize {
    ((seconds * sample_rate).round() as usize).max(1)
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::Signal;

    pub const SR: f32 = 44100.0;

    pub fn render(signal: &mut dyn Signal, n: usize) -> Vec<f32> {
        (0..n).map(|_| signal.tick()).collect()
    }

    pub fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    pub struct Dc(pub f32);

    impl Signal for Dc {
        fn tick(&mut self) -> f32 {
            self.0
        }
    }
}
