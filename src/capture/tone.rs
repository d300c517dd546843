// src/capture/tone.rs

use std::f32::consts::TAU;

use super::FrameSource;
use crate::error::DeviceError;

/// Phase-continuous sine generator. Stands in for a microphone in demo mode
/// and in tests.
pub struct ToneSource {
    frequency_hz: f32,
    amplitude: f32,
    sample_rate: u32,
    phase: f32,
}

impl ToneSource {
    pub fn new(frequency_hz: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            frequency_hz,
            amplitude,
            sample_rate: sample_rate.max(1),
            phase: 0.0,
        }
    }

    /// Frequency that lands exactly on `bin` for a given frame size.
    pub fn bin_frequency(bin: usize, frame_size: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / frame_size as f32
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency_hz = frequency_hz;
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
    }
}

impl FrameSource for ToneSource {
    fn next_frame(&mut self, frame: &mut [f32]) -> Result<(), DeviceError> {
        let step = TAU * self.frequency_hz / self.sample_rate as f32;
        for s in frame.iter_mut() {
            *s = self.amplitude * self.phase.sin();
            self.phase = (self.phase + step) % TAU;
        }
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn describe(&self) -> String {
        format!("tone {:.1} Hz", self.frequency_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_amplitude_and_continuity() {
        let mut tone = ToneSource::new(1000.0, 0.5, 48_000);
        let mut a = vec![0.0; 480];
        let mut b = vec![0.0; 480];
        tone.next_frame(&mut a).unwrap();
        tone.next_frame(&mut b).unwrap();

        let peak = a.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.01);
        // 1 kHz at 48 kHz repeats every 48 samples, so a 480-sample frame wraps cleanly
        assert!((a[0] - b[0]).abs() < 1e-3);
    }

    #[test]
    fn test_bin_frequency() {
        assert_eq!(ToneSource::bin_frequency(32, 2048, 44_100), 32.0 * 44_100.0 / 2048.0);
    }
}
