// src/config.rs

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::analysis::SPECTRUM_BINS;

/// Highest addressable display bin.
pub const MAX_BIN: usize = SPECTRUM_BINS - 1;

pub const NOISE_GATE_MAX: f32 = 0.01;
pub const DEFAULT_DECAY: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    Circle,
    Histogram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Linear sweep over the selected range.
    Direct,
    /// Range resampled to half the bins and written to both halves.
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Line,
    Dot,
}

impl LayoutType {
    pub fn toggled(self) -> Self {
        match self {
            LayoutType::Circle => LayoutType::Histogram,
            LayoutType::Histogram => LayoutType::Circle,
        }
    }
}

impl Pattern {
    pub fn toggled(self) -> Self {
        match self {
            Pattern::Direct => Pattern::Mirror,
            Pattern::Mirror => Pattern::Direct,
        }
    }
}

impl Style {
    pub fn toggled(self) -> Self {
        match self {
            Style::Line => Style::Dot,
            Style::Dot => Style::Line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Accepts `#rrggbb` or `rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected a #rrggbb color, got '{s}'"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("invalid hex digits in color '{s}'"))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Inclusive bin range selected for display. `min_bin < max_bin <= 255`
/// holds for anything built through [`FrequencyRange::clamped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub min_bin: usize,
    pub max_bin: usize,
}

impl FrequencyRange {
    pub const FULL: Self = Self {
        min_bin: 0,
        max_bin: MAX_BIN,
    };

    /// Clamp both ends into `0..=255` and keep `min < max`, moving `min`
    /// down when the two collide.
    pub fn clamped(min_bin: i64, max_bin: i64) -> Self {
        let max_bin = max_bin.clamp(1, MAX_BIN as i64);
        let min_bin = min_bin.clamp(0, max_bin - 1);
        Self {
            min_bin: min_bin as usize,
            max_bin: max_bin as usize,
        }
    }

    pub fn span(&self) -> usize {
        self.max_bin.saturating_sub(self.min_bin)
    }
}

impl Default for FrequencyRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Snapshot of everything the UI can change. The pipeline reads one of these
/// per tick and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationConfig {
    pub layout_type: LayoutType,
    pub pattern: Pattern,
    pub style: Style,
    pub color: Rgb,
    pub background_color: Rgb,
    pub transparent_background: bool,
    pub frequency_range: FrequencyRange,
    /// Absolute sample amplitude below which input counts as silence.
    pub noise_gate: f32,
    /// Weight of the newest spectrum in the exponential smoother.
    pub smoothing_factor: f32,
    /// Per-tick release multiplier for the display envelope.
    pub decay_factor: f32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            layout_type: LayoutType::Circle,
            pattern: Pattern::Direct,
            style: Style::Line,
            color: Rgb::new(0, 255, 255),
            background_color: Rgb::new(0, 0, 255),
            transparent_background: true,
            frequency_range: FrequencyRange::FULL,
            noise_gate: 0.001,
            smoothing_factor: 0.3,
            decay_factor: DEFAULT_DECAY,
        }
    }
}

impl VisualizationConfig {
    /// Apply every boundary clamp. Non-finite values fall back to defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.frequency_range = FrequencyRange::clamped(
            self.frequency_range.min_bin as i64,
            self.frequency_range.max_bin as i64,
        );
        self.noise_gate = clamp_finite(self.noise_gate, 0.0, NOISE_GATE_MAX, defaults.noise_gate);
        self.smoothing_factor =
            clamp_finite(self.smoothing_factor, 0.0, 1.0, defaults.smoothing_factor);
        self.decay_factor = clamp_finite(self.decay_factor, 0.01, 0.99, defaults.decay_factor);
        self
    }

    pub fn set_frequency_range(&mut self, min_bin: i64, max_bin: i64) {
        self.frequency_range = FrequencyRange::clamped(min_bin, max_bin);
    }

    pub fn shift_min_bin(&mut self, delta: i64) {
        let range = self.frequency_range;
        let min_bin = (range.min_bin as i64 + delta).clamp(0, range.max_bin as i64 - 1);
        self.set_frequency_range(min_bin, range.max_bin as i64);
    }

    pub fn shift_max_bin(&mut self, delta: i64) {
        let range = self.frequency_range;
        let max_bin = (range.max_bin as i64 + delta).max(range.min_bin as i64 + 1);
        self.set_frequency_range(range.min_bin as i64, max_bin);
    }

    pub fn set_noise_gate(&mut self, gate: f32) {
        self.noise_gate = clamp_finite(gate, 0.0, NOISE_GATE_MAX, self.noise_gate);
    }

    pub fn set_smoothing_factor(&mut self, alpha: f32) {
        self.smoothing_factor = clamp_finite(alpha, 0.0, 1.0, self.smoothing_factor);
    }
}

fn clamp_finite(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    }
}
