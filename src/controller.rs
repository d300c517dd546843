// src/controller.rs

use std::fmt::Write as FmtWrite;
use std::io::{Write, stdout};

use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::{
    cursor::MoveTo,
    execute,
    style::{Color, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate},
};

use crate::capture::{
    CaptureConfig, DeviceId, FrameSource, InputDeviceInfo, InputSelection, list_input_devices,
};
use crate::config::{Rgb, VisualizationConfig};
use crate::error::DeviceError;
use crate::pipeline::{TickOutcome, VisualizerPipeline};
use crate::render::{TerminalCanvas, build_scene};

/// Rows kept below the visualization for status text.
const STATUS_ROWS: usize = 3;

const NOISE_GATE_STEP: f32 = 0.0001;
const SMOOTHING_STEP: f32 = 0.01;

/// Terminal front end: owns the config snapshot, the pipeline and the
/// currently open source, and drives start/stop, keys and drawing.
pub struct VizController {
    pub config: VisualizationConfig,
    capture: CaptureConfig,
    input: InputSelection,

    // Present only while running. Dropping it releases the device.
    source: Option<Box<dyn FrameSource>>,
    pipeline: VisualizerPipeline,

    devices: Vec<InputDeviceInfo>,
    status: Option<String>,
    skipped_ticks: u64,

    term: TerminalCanvas,
    force_redraw: bool,

    // Reusable buffer for terminal output.
    draw_buffer: String,
}

impl VizController {
    pub fn new(config: VisualizationConfig, capture: CaptureConfig, input: InputSelection) -> Self {
        let pipeline = VisualizerPipeline::new(capture.frame_size);
        Self {
            config: config.sanitized(),
            capture,
            input,
            source: None,
            pipeline,
            devices: Vec::new(),
            status: None,
            skipped_ticks: 0,
            term: TerminalCanvas::new(80, 20),
            force_redraw: true,
            draw_buffer: String::with_capacity(16 * 1024),
        }
    }

    pub fn is_running(&self) -> bool {
        self.source.is_some()
    }

    /// Open the selected input. Failure is reported in the status line and
    /// returned; the controller stays stopped.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        if self.is_running() {
            return Ok(());
        }
        match self.input.open(&self.capture) {
            Ok(source) => {
                log::info!("Visualizer started: {}", source.describe());
                self.status = Some(format!("Listening to {}", source.describe()));
                self.source = Some(source);
                self.skipped_ticks = 0;
                self.force_redraw = true;
                Ok(())
            }
            Err(e) => {
                log::error!("Could not start audio stream: {e}");
                self.status = Some(format!("Could not start audio stream: {e}"));
                self.force_redraw = true;
                Err(e)
            }
        }
    }

    /// Release the device and clear the display. Safe to call when stopped.
    pub fn stop(&mut self) {
        if let Some(source) = self.source.take() {
            log::info!("Visualizer stopped: {}", source.describe());
            drop(source);
        }
        self.pipeline.reset();
        self.force_redraw = true;
    }

    pub fn toggle_running(&mut self) {
        if self.is_running() {
            self.stop();
        } else {
            let _ = self.start();
        }
    }

    /// Switch to the next enumerated input device, restarting if running.
    pub fn select_next_device(&mut self) {
        if !self.input.is_microphone() {
            self.status = Some("Device switching only applies to microphone input".into());
            return;
        }

        match list_input_devices() {
            Ok(devices) => self.devices = devices,
            Err(e) => {
                log::warn!("Device enumeration failed: {e}");
                self.status = Some(format!("Device enumeration failed: {e}"));
                return;
            }
        }
        if self.devices.is_empty() {
            self.status = Some("No input devices found".into());
            return;
        }

        let current = self.capture.device.clone().or_else(|| {
            self.devices.iter().find(|d| d.is_default).map(|d| d.id.clone())
        });
        let next_idx = current
            .and_then(|id| self.devices.iter().position(|d| d.id == id))
            .map(|i| (i + 1) % self.devices.len())
            .unwrap_or(0);
        let next: DeviceId = self.devices[next_idx].id.clone();
        self.set_device(Some(next));
    }

    /// Changing device requires a full stop before the new stream opens.
    pub fn set_device(&mut self, device: Option<DeviceId>) {
        let was_running = self.is_running();
        self.stop();
        self.status = Some(match &device {
            Some(id) => format!("Input device: {id}"),
            None => "Input device: default".into(),
        });
        self.capture.device = device;
        if was_running {
            let _ = self.start();
        }
    }

    /// Advance the pipeline by one frame if running.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        let source = self.source.as_mut()?;
        let outcome = self.pipeline.tick(source.as_mut(), &self.config);

        if let TickOutcome::Skipped(e) = &outcome {
            if e.is_transient() {
                self.skipped_ticks += 1;
                log::debug!("Skipped tick: {e}");
            } else {
                log::error!("Input failed, stopping: {e}");
                self.status = Some(format!("Input stopped: {e}"));
                self.stop();
            }
        }
        Some(outcome)
    }

    pub fn run_tick(&mut self) -> Result<(), anyhow::Error> {
        // 1. Logic tick
        let ticked = self.tick().is_some();

        // 2. Dirty check: a stopped visualizer only redraws on change
        if !ticked && !self.force_redraw {
            return Ok(());
        }
        self.force_redraw = false;

        // 3. Fit the raster to the terminal
        let (cols, rows) = terminal::size()?;
        let rows = (rows as usize).saturating_sub(STATUS_ROWS);
        if self.term.cols() != cols as usize || self.term.rows() != rows.max(4) {
            self.term.resize(cols as usize, rows);
        }

        // 4. Rasterize
        let levels = self.is_running().then(|| self.pipeline.display().levels());
        let scene = build_scene(levels, &self.config, self.term.scene_canvas());
        self.term.draw(&scene);

        // 5. Build output buffer
        self.draw_buffer.clear();
        let _ = write!(self.draw_buffer, "{}", MoveTo(0, 0));
        let _ = write!(self.draw_buffer, "{}", SetForegroundColor(to_color(self.config.color)));
        if !self.config.transparent_background {
            let _ = write!(
                self.draw_buffer,
                "{}",
                SetBackgroundColor(to_color(self.config.background_color))
            );
        }
        for line in self.term.lines() {
            let _ = write!(self.draw_buffer, "{}\x1b[K\r\n", line);
        }
        let _ = write!(self.draw_buffer, "{}", ResetColor);

        self.write_status();

        // 6. Flush to terminal
        let mut stdout = stdout();
        execute!(stdout, BeginSynchronizedUpdate)?;
        stdout.write_all(self.draw_buffer.as_bytes())?;
        execute!(stdout, EndSynchronizedUpdate)?;
        stdout.flush()?;

        Ok(())
    }

    fn write_status(&mut self) {
        let cfg = &self.config;
        let row = self.term.rows() as u16;
        let source = self
            .source
            .as_ref()
            .map(|s| s.describe())
            .unwrap_or_else(|| "stopped".into());

        let _ = write!(self.draw_buffer, "{}{}", MoveTo(0, row), Clear(ClearType::UntilNewLine));
        let _ = write!(
            self.draw_buffer,
            "{} {} | {:?}/{:?}/{:?} | bins {}-{} | gate {:.4} | smooth {:.2} | skipped {}",
            if self.is_running() { "▶" } else { "■" },
            source,
            cfg.layout_type,
            cfg.pattern,
            cfg.style,
            cfg.frequency_range.min_bin,
            cfg.frequency_range.max_bin,
            cfg.noise_gate,
            cfg.smoothing_factor,
            self.skipped_ticks,
        );

        let _ = write!(
            self.draw_buffer,
            "{}{}",
            MoveTo(0, row + 1),
            Clear(ClearType::UntilNewLine)
        );
        if let Some(msg) = &self.status {
            let _ = write!(self.draw_buffer, "{msg}");
        }

        let _ = write!(
            self.draw_buffer,
            "{}{}[SPACE] Start/Stop [L]ayout [P]attern [S]tyle [B]ackground [D]evice \
             ←/→ min ↓/↑ max [ ] gate -/= smoothing [Q]uit",
            MoveTo(0, row + 2),
            Clear(ClearType::UntilNewLine)
        );
    }

    pub fn handle_key(&mut self, key: KeyCode, _modifiers: KeyModifiers) {
        // Lifecycle keys first; they need all of `self`.
        match key {
            KeyCode::Char(' ') => {
                self.toggle_running();
                self.force_redraw = true;
                return;
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                self.select_next_device();
                self.force_redraw = true;
                return;
            }
            _ => {}
        }

        let cfg = &mut self.config;
        match key {
            KeyCode::Char('l') | KeyCode::Char('L') => cfg.layout_type = cfg.layout_type.toggled(),
            KeyCode::Char('p') | KeyCode::Char('P') => cfg.pattern = cfg.pattern.toggled(),
            KeyCode::Char('s') | KeyCode::Char('S') => cfg.style = cfg.style.toggled(),
            KeyCode::Char('b') | KeyCode::Char('B') => {
                cfg.transparent_background = !cfg.transparent_background
            }

            KeyCode::Left => cfg.shift_min_bin(-1),
            KeyCode::Right => cfg.shift_min_bin(1),
            KeyCode::Down => cfg.shift_max_bin(-1),
            KeyCode::Up => cfg.shift_max_bin(1),

            KeyCode::Char('[') => cfg.set_noise_gate(cfg.noise_gate - NOISE_GATE_STEP),
            KeyCode::Char(']') => cfg.set_noise_gate(cfg.noise_gate + NOISE_GATE_STEP),
            KeyCode::Char('-') => cfg.set_smoothing_factor(cfg.smoothing_factor - SMOOTHING_STEP),
            KeyCode::Char('=') | KeyCode::Char('+') => {
                cfg.set_smoothing_factor(cfg.smoothing_factor + SMOOTHING_STEP)
            }
            _ => return,
        }
        self.force_redraw = true;
    }

    pub fn should_quit(&self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        matches!(key, KeyCode::Char('q') | KeyCode::Char('Q'))
            || (key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL))
    }

    pub fn request_redraw(&mut self) {
        self.force_redraw = true;
    }

    pub fn pipeline(&self) -> &VisualizerPipeline {
        &self.pipeline
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

impl Drop for VizController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ToneSource;
    use crate::config::{LayoutType, Pattern};

    fn tone_controller() -> VizController {
        let capture = CaptureConfig {
            frame_size: 1024,
            ..Default::default()
        };
        let input = InputSelection::Tone {
            frequency_hz: ToneSource::bin_frequency(12, 1024, 44_100),
            amplitude: 0.5,
            sample_rate: 44_100,
        };
        VizController::new(VisualizationConfig::default(), capture, input)
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let mut ctrl = tone_controller();
        assert!(!ctrl.is_running());
        assert!(ctrl.tick().is_none());

        ctrl.start().unwrap();
        assert!(ctrl.is_running());
        assert!(matches!(ctrl.tick(), Some(TickOutcome::Updated { silent: false })));
        assert!(!ctrl.pipeline().display().is_blank());

        ctrl.stop();
        assert!(!ctrl.is_running());
        assert!(ctrl.pipeline().display().is_blank());

        // Stopping twice is harmless
        ctrl.stop();
        assert!(!ctrl.is_running());
    }

    #[test]
    fn test_missing_wav_reports_start_failure() {
        let input = InputSelection::Wav {
            path: "/definitely/not/here.wav".into(),
            looping: false,
        };
        let mut ctrl = VizController::new(VisualizationConfig::default(), CaptureConfig::default(), input);
        assert!(ctrl.start().is_err());
        assert!(!ctrl.is_running());
        assert!(ctrl.status().unwrap().starts_with("Could not start audio stream"));
    }

    #[test]
    fn test_exhausted_input_stops_controller() {
        let mut ctrl = tone_controller();
        ctrl.source = Some(Box::new(crate::capture::WavSource::from_samples(
            vec![0.5; 1024],
            44_100,
            false,
            "clip".into(),
        )));
        assert!(matches!(ctrl.tick(), Some(TickOutcome::Updated { .. })));
        assert!(matches!(ctrl.tick(), Some(TickOutcome::Skipped(DeviceError::Exhausted))));
        assert!(!ctrl.is_running());
    }

    struct StarvedSource;

    impl FrameSource for StarvedSource {
        fn next_frame(&mut self, frame: &mut [f32]) -> Result<(), DeviceError> {
            Err(DeviceError::Underrun { available: 0, needed: frame.len() })
        }

        fn sample_rate(&self) -> u32 {
            44_100
        }

        fn describe(&self) -> String {
            "starved".into()
        }
    }

    #[test]
    fn test_underrun_skips_tick_but_keeps_running() {
        let mut ctrl = tone_controller();
        ctrl.source = Some(Box::new(StarvedSource));
        for _ in 0..3 {
            assert!(matches!(ctrl.tick(), Some(TickOutcome::Skipped(DeviceError::Underrun { .. }))));
        }
        assert!(ctrl.is_running());
        assert_eq!(ctrl.skipped_ticks, 3);
        assert!(ctrl.status().is_none());
    }

    #[test]
    fn test_keys_update_config() {
        let mut ctrl = tone_controller();
        let none = KeyModifiers::NONE;

        ctrl.handle_key(KeyCode::Char('l'), none);
        assert_eq!(ctrl.config.layout_type, LayoutType::Histogram);
        ctrl.handle_key(KeyCode::Char('P'), none);
        assert_eq!(ctrl.config.pattern, Pattern::Mirror);

        ctrl.handle_key(KeyCode::Right, none);
        assert_eq!(ctrl.config.frequency_range.min_bin, 1);
        ctrl.handle_key(KeyCode::Up, none);
        assert_eq!(ctrl.config.frequency_range.max_bin, 255);

        for _ in 0..500 {
            ctrl.handle_key(KeyCode::Char(']'), none);
        }
        assert_eq!(ctrl.config.noise_gate, crate::config::NOISE_GATE_MAX);

        ctrl.handle_key(KeyCode::Char(' '), none);
        assert!(ctrl.is_running());
        ctrl.handle_key(KeyCode::Char(' '), none);
        assert!(!ctrl.is_running());
    }

    #[test]
    fn test_quit_keys() {
        let ctrl = tone_controller();
        assert!(ctrl.should_quit(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(ctrl.should_quit(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!ctrl.should_quit(KeyCode::Char('c'), KeyModifiers::NONE));
    }
}
