// src/capture/wav.rs

use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::FrameSource;
use crate::analysis::window::downmix_into;
use crate::error::DeviceError;

/// Serves a WAV file as a stream of mono frames, optionally looping.
pub struct WavSource {
    samples: Vec<f32>,
    position: usize,
    sample_rate: u32,
    looping: bool,
    name: String,
}

impl WavSource {
    pub fn open(path: &Path, looping: bool) -> Result<Self, DeviceError> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let mut samples = Vec::with_capacity(interleaved.len() / channels);
        downmix_into(&interleaved, channels, &mut samples);

        log::info!(
            "Loaded {}: {} samples @ {} Hz ({} ch)",
            path.display(),
            samples.len(),
            spec.sample_rate,
            channels
        );

        Ok(Self::from_samples(
            samples,
            spec.sample_rate,
            looping,
            path.display().to_string(),
        ))
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, looping: bool, name: String) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate,
            looping,
            name,
        }
    }
}

impl FrameSource for WavSource {
    fn next_frame(&mut self, frame: &mut [f32]) -> Result<(), DeviceError> {
        if self.samples.is_empty() {
            return Err(DeviceError::Exhausted);
        }
        if !self.looping && self.position + frame.len() > self.samples.len() {
            return Err(DeviceError::Exhausted);
        }

        for s in frame.iter_mut() {
            if self.position >= self.samples.len() {
                self.position = 0;
            }
            *s = self.samples[self.position];
            self.position += 1;
        }
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
