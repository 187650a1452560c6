/// Audio output using cpal
///
/// The stream callback owns the [`Mixer`]; the control thread talks to it
/// only through the [`Bus`] command queue.
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::{Error, Result};

pub mod bus;
pub mod mixer;

pub use bus::{Bus, Command, MixerLink, Route, Voice, VoiceHandle, VoiceId};
pub use mixer::Mixer;

/// Sample rate assumed when no device is available.
pub const FALLBACK_SAMPLE_RATE: f32 = 44100.0;

pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: f32,
    channels: usize,
}

impl AudioOutput {
    /// Open the default output device and start rendering `link`'s voices.
    pub fn start(link: MixerLink) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioDevice("no default output device".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::AudioDevice(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let mut mixer = Mixer::new(link);
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        mixer.render(data, channels);
                    },
                    |err| log::error!("Audio stream error: {}", err),
                    None,
                )
                .map_err(|e| Error::AudioStream(e.to_string()))?,
            other => return Err(Error::UnsupportedFormat(format!("{:?}", other))),
        };

        stream
            .play()
            .map_err(|e| Error::AudioStream(e.to_string()))?;

        log::info!(
            "Audio output on {} at {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "unknown device".to_string()),
            sample_rate,
            channels
        );

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}
