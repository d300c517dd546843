// src/pipeline.rs

use crate::analysis::{
    DisplayEnvelope, DisplayState, SpectrumAnalyzer, TemporalAverager, map_bins,
};
use crate::capture::FrameSource;
use crate::config::VisualizationConfig;
use crate::error::DeviceError;

/// What happened on one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A frame was processed and the display state advanced.
    Updated { silent: bool },
    /// The source failed; no pipeline state was touched.
    Skipped(DeviceError),
}

/// FrameSource -> SpectrumAnalyzer -> map_bins -> TemporalAverager -> DisplayEnvelope.
///
/// Owns every piece of per-stream state. Driven from a single thread, one
/// frame per tick.
pub struct VisualizerPipeline {
    frame: Vec<f32>,
    analyzer: SpectrumAnalyzer,
    averager: TemporalAverager,
    envelope: DisplayEnvelope,
}

impl VisualizerPipeline {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame: vec![0.0; frame_size],
            analyzer: SpectrumAnalyzer::new(frame_size),
            averager: TemporalAverager::new(),
            envelope: DisplayEnvelope::new(),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame.len()
    }

    /// Pull one frame from `source` and run it through. A failed read
    /// leaves all state exactly as it was.
    pub fn tick<S>(&mut self, source: &mut S, config: &VisualizationConfig) -> TickOutcome
    where
        S: FrameSource + ?Sized,
    {
        if let Err(e) = source.next_frame(&mut self.frame) {
            return TickOutcome::Skipped(e);
        }

        let frame = std::mem::take(&mut self.frame);
        self.process_frame(&frame, config);
        let silent = self.analyzer.is_silent();
        self.frame = frame;

        TickOutcome::Updated { silent }
    }

    /// Run one already-captured frame through every stage.
    ///
    /// Silent frames still advance the smoother and the averager, but the
    /// envelope only releases, so the display fades out instead of
    /// re-normalizing a dying spectrum back to full scale.
    pub fn process_frame(&mut self, frame: &[f32], config: &VisualizationConfig) -> &DisplayState {
        let spectrum =
            self.analyzer
                .process(frame, config.noise_gate, config.smoothing_factor);
        let mapped = map_bins(spectrum, config.frequency_range, config.pattern);
        let averaged = self.averager.push(mapped);

        if self.analyzer.is_silent() {
            log::trace!("Silent frame below gate {:.4}", config.noise_gate);
            self.envelope.release(config.decay_factor)
        } else {
            self.envelope.update(&averaged, config.decay_factor)
        }
    }

    pub fn display(&self) -> &DisplayState {
        self.envelope.state()
    }

    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }

    pub fn history_len(&self) -> usize {
        self.averager.len()
    }

    /// Drop all per-stream state. Called on stop so a restart begins clean.
    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.averager.clear();
        self.envelope.reset();
        self.frame.fill(0.0);
    }
}
