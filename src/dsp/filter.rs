/// Biquad filters on top of the `biquad` crate.
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};

use super::Effect;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    BandPass,
}

/// A fixed-parameter biquad section.
pub struct Filter {
    kind: FilterKind,
    inner: DirectForm2Transposed<f32>,
}

impl Filter {
    /// Low-pass with a Butterworth response.
    pub fn low_pass(cutoff: f32, sample_rate: f32) -> Result<Self> {
        Self::new(FilterKind::LowPass, cutoff, Q_BUTTERWORTH_F32, sample_rate)
    }

    pub fn band_pass(center: f32, q: f32, sample_rate: f32) -> Result<Self> {
        Self::new(FilterKind::BandPass, center, q, sample_rate)
    }

    pub fn new(kind: FilterKind, freq: f32, q: f32, sample_rate: f32) -> Result<Self> {
        // the coefficient solver rejects corners at or above Nyquist
        let freq = freq.clamp(10.0, sample_rate * 0.45);
        let filter_type = match kind {
            FilterKind::LowPass => Type::LowPass,
            FilterKind::BandPass => Type::BandPass,
        };
        let mut coeffs =
            Coefficients::<f32>::from_params(filter_type, sample_rate.hz(), freq.hz(), q)
                .map_err(|e| Error::Filter(format!("{:?} at {} Hz, q {}", e, freq, q)))?;
        if kind == FilterKind::BandPass {
            // constant skirt gain peaks at q; rescale to a 0 dB peak
            coeffs.b0 /= q;
            coeffs.b2 /= q;
        }
        Ok(Self {
            kind,
            inner: DirectForm2Transposed::<f32>::new(coeffs),
        })
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }
}

impl Effect for Filter {
    fn process(&mut self, input: f32) -> f32 {
        self.inner.run(input)
    }
}
