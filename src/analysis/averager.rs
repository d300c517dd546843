// src/analysis/averager.rs

use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, RingBuffer},
};

use super::{DisplayFrame, SPECTRUM_BINS};

pub const HISTORY_FRAMES: usize = 3;

/// Moving average over the last few display frames to take the edge off
/// frame-to-frame flicker.
pub struct TemporalAverager {
    history: HeapRb<DisplayFrame>,
}

impl TemporalAverager {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_FRAMES)
    }

    pub fn with_capacity(frames: usize) -> Self {
        Self {
            history: HeapRb::new(frames.max(1)),
        }
    }

    /// Push a frame, evicting the oldest once full, and return the per-bin
    /// mean of everything currently held.
    pub fn push(&mut self, frame: DisplayFrame) -> DisplayFrame {
        self.history.push_overwrite(frame);
        self.average()
    }

    pub fn average(&self) -> DisplayFrame {
        let mut out = [0.0; SPECTRUM_BINS];
        let count = self.history.occupied_len();
        if count == 0 {
            return out;
        }
        for frame in self.history.iter() {
            for (acc, &v) in out.iter_mut().zip(frame.iter()) {
                *acc += v;
            }
        }
        let scale = 1.0 / count as f32;
        for v in out.iter_mut() {
            *v *= scale;
        }
        out
    }

    pub fn len(&self) -> usize {
        self.history.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for TemporalAverager {
    fn default() -> Self {
        Self::new()
    }
}
