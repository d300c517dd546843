// src/analysis/spectrum.rs

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use super::window::{apply_noise_gate, hann_window};
use super::{SPECTRUM_BINS, Spectrum};

/// Smoothed magnitudes below this snap to zero, so silence converges in a
/// bounded number of ticks instead of crawling through denormals.
pub const SMOOTHING_FLOOR: f32 = 1e-6;

/// Windows each frame, takes the FFT magnitude and keeps an exponentially
/// smoothed running spectrum across ticks.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    gated: Vec<f32>,
    complex_buffer: Vec<Complex<f32>>,
    raw: Spectrum,
    previous: Spectrum,
    smoothed: Spectrum,
    silent: bool,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            planner,
            fft,
            fft_size,
            window: hann_window(fft_size),
            gated: Vec::with_capacity(fft_size),
            complex_buffer: vec![Complex { re: 0.0, im: 0.0 }; fft_size],
            raw: [0.0; SPECTRUM_BINS],
            previous: [0.0; SPECTRUM_BINS],
            smoothed: [0.0; SPECTRUM_BINS],
            silent: true,
        }
    }

    /// Run one frame through gate, window, FFT and smoother.
    ///
    /// A frame whose gated peak does not exceed `noise_gate` is silent: the
    /// smoother still advances, with an all-zero raw spectrum, so the output
    /// fades instead of freezing on the last loud frame.
    pub fn process(&mut self, frame: &[f32], noise_gate: f32, smoothing_factor: f32) -> &Spectrum {
        let gate = if noise_gate.is_finite() { noise_gate.max(0.0) } else { 0.0 };
        let alpha = if smoothing_factor.is_finite() {
            smoothing_factor.clamp(0.0, 1.0)
        } else {
            0.0
        };

        self.gated.clear();
        self.gated.extend_from_slice(frame);
        let peak = apply_noise_gate(&mut self.gated, gate);

        self.silent = frame.is_empty() || peak <= gate;
        if self.silent {
            self.raw = [0.0; SPECTRUM_BINS];
        } else {
            self.compute_magnitudes();
        }

        for i in 0..SPECTRUM_BINS {
            let mut v = alpha * self.raw[i] + (1.0 - alpha) * self.previous[i];
            if v < SMOOTHING_FLOOR {
                v = 0.0;
            }
            self.smoothed[i] = v;
        }
        self.previous = self.smoothed;

        &self.smoothed
    }

    fn compute_magnitudes(&mut self) {
        let n = self.gated.len();
        if n != self.fft_size {
            self.resize(n);
        }

        for (i, (&s, &w)) in self.gated.iter().zip(&self.window).enumerate() {
            self.complex_buffer[i] = Complex { re: s * w, im: 0.0 };
        }
        self.fft.process(&mut self.complex_buffer);

        // Frames shorter than the display leave the upper bins at zero.
        self.raw = [0.0; SPECTRUM_BINS];
        for (out, c) in self.raw.iter_mut().zip(&self.complex_buffer) {
            let mag = c.norm();
            *out = if mag.is_finite() { mag } else { 0.0 };
        }
    }

    fn resize(&mut self, fft_size: usize) {
        log::debug!("Re-planning FFT: {} -> {} samples", self.fft_size, fft_size);
        self.fft = self.planner.plan_fft_forward(fft_size);
        self.fft_size = fft_size;
        self.window = hann_window(fft_size);
        self.complex_buffer = vec![Complex { re: 0.0, im: 0.0 }; fft_size];
    }

    pub fn smoothed(&self) -> &Spectrum {
        &self.smoothed
    }

    /// Raw magnitude spectrum of the last processed frame, before smoothing.
    pub fn raw(&self) -> &Spectrum {
        &self.raw
    }

    /// Whether the last processed frame was below the noise gate.
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn reset(&mut self) {
        self.raw = [0.0; SPECTRUM_BINS];
        self.previous = [0.0; SPECTRUM_BINS];
        self.smoothed = [0.0; SPECTRUM_BINS];
        self.silent = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(n: usize, cycles: f32, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (2.0 * PI * cycles * i as f32 / n as f32).sin())
            .collect()
    }

    fn argmax(s: &Spectrum) -> usize {
        s.iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    }

    #[test]
    fn test_output_is_256_bins_for_any_frame_size() {
        for n in [64, 256, 1000, 1024, 2048] {
            let mut analyzer = SpectrumAnalyzer::new(1024);
            let out = analyzer.process(&sine(n, 8.0, 0.5), 0.001, 1.0);
            assert_eq!(out.len(), SPECTRUM_BINS);
            assert!(out.iter().all(|v| v.is_finite() && *v >= 0.0));
            assert_eq!(analyzer.fft_size(), n);
        }
    }

    #[test]
    fn test_short_frame_zero_fills_upper_bins() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        let out = analyzer.process(&sine(64, 4.0, 0.5), 0.0, 1.0);
        assert!(out[64..].iter().all(|&v| v == 0.0));
        assert!(out[4] > 0.0);
    }

    #[test]
    fn test_peak_lands_on_sine_bin() {
        let mut analyzer = SpectrumAnalyzer::new(2048);
        let out = analyzer.process(&sine(2048, 40.0, 0.5), 0.001, 1.0);
        assert_eq!(argmax(out), 40);
        assert!(!analyzer.is_silent());
    }

    #[test]
    fn test_smoothing_blends_with_previous() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        let frame = sine(1024, 16.0, 0.5);

        let first = analyzer.process(&frame, 0.0, 0.3)[16];
        let raw = analyzer.raw()[16];
        assert!((first - 0.3 * raw).abs() < 1e-3 * raw);

        let second = analyzer.process(&frame, 0.0, 0.3)[16];
        let expected = 0.3 * raw + 0.7 * first;
        assert!((second - expected).abs() < 1e-3 * raw);
    }

    #[test]
    fn test_silent_frame_decays_toward_zero() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        let loud = analyzer.process(&sine(1024, 16.0, 0.5), 0.001, 1.0)[16];
        assert!(loud > 0.0);

        let quiet = vec![0.0005; 1024];
        let after = analyzer.process(&quiet, 0.001, 0.5)[16];
        assert!(analyzer.is_silent());
        assert!((after - loud * 0.5).abs() < 1e-3 * loud);
    }

    #[test]
    fn test_zero_input_reaches_exact_zero_in_bounded_ticks() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        analyzer.process(&sine(1024, 16.0, 1.0), 0.0, 1.0);

        let zeros = vec![0.0; 1024];
        let mut ticks = 0;
        while analyzer.smoothed().iter().any(|&v| v != 0.0) {
            analyzer.process(&zeros, 0.001, 0.3);
            ticks += 1;
            assert!(ticks < 200, "smoothed spectrum never reached zero");
        }
    }

    #[test]
    fn test_zero_smoothing_holds_previous() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        analyzer.process(&sine(1024, 16.0, 0.5), 0.0, 1.0);
        let held = *analyzer.smoothed();
        analyzer.process(&sine(1024, 64.0, 0.5), 0.0, 0.0);
        assert_eq!(*analyzer.smoothed(), held);
    }

    #[test]
    fn test_empty_frame_is_silent() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        let out = analyzer.process(&[], 0.001, 0.3);
        assert!(out.iter().all(|&v| v == 0.0));
        assert!(analyzer.is_silent());
    }
}
