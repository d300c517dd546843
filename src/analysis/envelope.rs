// src/analysis/envelope.rs

use serde::Serialize;

use super::{DisplayFrame, SPECTRUM_BINS};

/// Normalized peak value of a display bin.
pub const FULL_SCALE: f32 = 255.0;

/// Envelope values under this snap to zero instead of decaying forever.
pub const DISPLAY_FLOOR: f32 = 0.1;

/// The values that drive rendering. Persistent across ticks; zeroed only
/// when the stream stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    #[serde(skip)]
    values: [f32; SPECTRUM_BINS],
    levels: Vec<u8>,
}

impl DisplayState {
    fn new() -> Self {
        Self {
            values: [0.0; SPECTRUM_BINS],
            levels: vec![0; SPECTRUM_BINS],
        }
    }

    /// Envelope values in `[0, 255]`.
    pub fn values(&self) -> &[f32; SPECTRUM_BINS] {
        &self.values
    }

    /// Integer-rounded values for the renderer.
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    fn refresh_levels(&mut self) {
        for (level, &v) in self.levels.iter_mut().zip(self.values.iter()) {
            *level = v.round().clamp(0.0, FULL_SCALE) as u8;
        }
    }
}

/// Scale a frame to `[0, 255]` by its own peak. A frame with no positive
/// peak comes back all zero.
pub fn normalize(frame: &DisplayFrame) -> DisplayFrame {
    let peak = frame
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f32, f32::max);

    let mut out = [0.0; SPECTRUM_BINS];
    if peak > 0.0 {
        let scale = FULL_SCALE / peak;
        for (o, &v) in out.iter_mut().zip(frame.iter()) {
            if v.is_finite() && v > 0.0 {
                *o = (v * scale).min(FULL_SCALE);
            }
        }
    }
    out
}

/// Per-bin instant attack and exponential release over [`DisplayState`].
pub struct DisplayEnvelope {
    state: DisplayState,
}

impl DisplayEnvelope {
    pub fn new() -> Self {
        Self {
            state: DisplayState::new(),
        }
    }

    /// Normalize the averaged frame and fold it into the envelope.
    pub fn update(&mut self, averaged: &DisplayFrame, decay_factor: f32) -> &DisplayState {
        let normalized = normalize(averaged);
        self.apply(&normalized, decay_factor)
    }

    /// Release every bin by one step, as if the input were all zero.
    pub fn release(&mut self, decay_factor: f32) -> &DisplayState {
        self.apply(&[0.0; SPECTRUM_BINS], decay_factor)
    }

    fn apply(&mut self, normalized: &DisplayFrame, decay_factor: f32) -> &DisplayState {
        let decay = if decay_factor.is_finite() {
            decay_factor.clamp(0.0, 1.0)
        } else {
            0.0
        };

        for (current, &target) in self.state.values.iter_mut().zip(normalized.iter()) {
            if target > *current {
                *current = target;
            } else {
                *current *= decay;
            }
            if *current < DISPLAY_FLOOR {
                *current = 0.0;
            }
        }
        self.state.refresh_levels();
        &self.state
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = DisplayState::new();
    }
}

impl Default for DisplayEnvelope {
    fn default() -> Self {
        Self::new()
    }
}
