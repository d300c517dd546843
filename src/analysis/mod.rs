// src/analysis/mod.rs

pub mod averager;
pub mod envelope;
pub mod mapper;
pub mod spectrum;
pub mod window;

/// Every spectrum, display frame and display state has exactly this many bins.
pub const SPECTRUM_BINS: usize = 256;

/// Smoothed magnitude per frequency bin, ascending.
pub type Spectrum = [f32; SPECTRUM_BINS];

/// One tick's spectrum remapped to the chosen range and pattern, not yet averaged.
pub type DisplayFrame = [f32; SPECTRUM_BINS];

pub use averager::TemporalAverager;
pub use envelope::{DisplayEnvelope, DisplayState};
pub use mapper::map_bins;
pub use spectrum::SpectrumAnalyzer;
