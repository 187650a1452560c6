/// Sample file loading for the `samples` instrument.
///
/// Files are decoded with `hound`, mixed down to mono and cached. A file
/// that fails to load disables the instrument until a different sample is
/// requested, so a missing file is reported once instead of every step.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dsp::sampler::SampleData;
use crate::error::{Error, Result};
use crate::settings::SampleChoice;

pub struct SampleBank {
    dir: PathBuf,
    cache: HashMap<SampleChoice, Arc<SampleData>>,
    failed: Option<SampleChoice>,
}

impl SampleBank {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
            failed: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The decoded sample for `choice`, loading it on first use.
    pub fn get(&mut self, choice: SampleChoice) -> Result<Arc<SampleData>> {
        if let Some(data) = self.cache.get(&choice) {
            return Ok(Arc::clone(data));
        }
        if self.failed == Some(choice) {
            return Err(Error::SampleUnavailable(choice.file_name().to_string()));
        }

        let path = self.dir.join(choice.file_name());
        match load_wav(&path) {
            Ok(data) => {
                log::info!(
                    "Loaded sample {} ({:.2}s at {} Hz)",
                    path.display(),
                    data.duration_secs(),
                    data.sample_rate
                );
                self.failed = None;
                let data = Arc::new(data);
                self.cache.insert(choice, Arc::clone(&data));
                Ok(data)
            }
            Err(e) => {
                log::warn!("{}; the samples instrument is disabled for this selection", e);
                self.failed = Some(choice);
                Err(e)
            }
        }
    }

    pub fn is_disabled(&self, choice: SampleChoice) -> bool {
        self.failed == Some(choice)
    }
}

/// Decode a WAV file into mono `f32` frames.
pub fn load_wav(path: &Path) -> Result<SampleData> {
    let wrap = |source| Error::SampleLoad {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = hound::WavReader::open(path).map_err(wrap)?;
    let spec = reader.spec();

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(wrap)?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .map_err(wrap)?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let frames = if channels == 1 {
        raw
    } else {
        raw.chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(SampleData::new(frames, spec.sample_rate))
}
