// src/capture/mod.rs

pub mod input;
pub mod tone;
pub mod wav;

use std::path::PathBuf;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait};
use serde::Serialize;

use crate::error::DeviceError;

pub use input::LiveInput;
pub use tone::ToneSource;
pub use wav::WavSource;

pub const DEFAULT_FRAME_SIZE: usize = 2048;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(33);

/// Anything that can hand the pipeline one fixed-size mono frame per tick.
pub trait FrameSource {
    /// Fill `frame` completely with the next mono samples. Must not block
    /// much longer than one tick; on error the caller skips the tick.
    fn next_frame(&mut self, frame: &mut [f32]) -> Result<(), DeviceError>;

    fn sample_rate(&self) -> u32;

    /// Human-readable name for status output.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self, frame: &mut [f32]) -> Result<(), DeviceError> {
        (**self).next_frame(frame)
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Opaque handle for an input device. cpal exposes no stable ids across
/// platforms, so the device name is what we match on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId(pub String);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InputDeviceInfo {
    pub id: DeviceId,
    pub is_default: bool,
    pub channels: u16,
    pub sample_rate: u32,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub frame_size: usize,
    pub tick_interval: Duration,
    /// `None` picks the host's default input.
    pub device: Option<DeviceId>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            device: None,
        }
    }
}

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum InputSelection {
    Microphone,
    Tone { frequency_hz: f32, amplitude: f32, sample_rate: u32 },
    Wav { path: PathBuf, looping: bool },
}

impl InputSelection {
    /// Open the selected source. For the microphone this claims the device
    /// until the returned source is dropped.
    pub fn open(&self, capture: &CaptureConfig) -> Result<Box<dyn FrameSource>, DeviceError> {
        let source: Box<dyn FrameSource> = match self {
            InputSelection::Microphone => Box::new(LiveInput::start(capture)?),
            InputSelection::Tone { frequency_hz, amplitude, sample_rate } => {
                Box::new(ToneSource::new(*frequency_hz, *amplitude, *sample_rate))
            }
            InputSelection::Wav { path, looping } => Box::new(WavSource::open(path, *looping)?),
        };
        Ok(source)
    }

    pub fn is_microphone(&self) -> bool {
        matches!(self, InputSelection::Microphone)
    }
}

/// All input-capable devices on the default host.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, DeviceError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        let Ok(name) = device.name() else {
            continue;
        };
        // Devices that advertise inputs but refuse a config are not usable.
        let Ok(config) = device.default_input_config() else {
            log::debug!("Skipping input device without default config: {name}");
            continue;
        };
        devices.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            id: DeviceId(name),
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
        });
    }
    Ok(devices)
}

/// Resolve a device id (or the default input) to a cpal device.
pub(crate) fn find_input_device(id: Option<&DeviceId>) -> Result<cpal::Device, DeviceError> {
    let host = cpal::default_host();
    match id {
        None => host.default_input_device().ok_or(DeviceError::NoInputDevice),
        Some(wanted) => {
            for device in host.input_devices()? {
                if device.name().ok().as_deref() == Some(wanted.0.as_str()) {
                    return Ok(device);
                }
            }
            Err(DeviceError::NotFound(wanted.0.clone()))
        }
    }
}
