// src/lib.rs

pub mod analysis;
pub mod capture;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod render;

pub use analysis::{DisplayState, SpectrumAnalyzer};
pub use capture::{CaptureConfig, FrameSource, InputSelection};
pub use config::VisualizationConfig;
pub use controller::VizController;
pub use error::DeviceError;
pub use pipeline::{TickOutcome, VisualizerPipeline};
