// src/error.rs

use thiserror::Error;

/// Failures at the audio-input seam. Only a few of these are worth stopping
/// the visualizer for; see [`DeviceError::is_transient`].
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("Input device not found: {0}")]
    NotFound(String),

    #[error("Failed to enumerate input devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    #[error("Failed to query input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Input stream error: {0}")]
    Stream(String),

    #[error("Input device disconnected")]
    Disconnected,

    #[error("Frame not ready: {available} of {needed} samples buffered")]
    Underrun { available: usize, needed: usize },

    #[error("WAV input error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Input exhausted")]
    Exhausted,
}

impl DeviceError {
    /// Transient errors skip a single tick; anything else ends the run.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeviceError::Stream(_) | DeviceError::Underrun { .. })
    }
}
