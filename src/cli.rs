// src/cli.rs

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::capture::{CaptureConfig, DeviceId, InputSelection};
use crate::config::{FrequencyRange, LayoutType, Pattern, Rgb, Style, VisualizationConfig};

const DEFAULT_TONE_AMPLITUDE: f32 = 0.5;
const DEFAULT_TONE_SAMPLE_RATE: u32 = 44_100;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "visualizer")]
#[command(about = "Live microphone spectrum visualizer", long_about = None)]
pub struct Args {
    /// Input device name (see --list-devices); default input if omitted
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Print input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a synthetic sine tone instead of the microphone
    #[arg(long, value_name = "HZ", conflicts_with = "wav")]
    pub tone: Option<f32>,

    /// Use a WAV file (looped) instead of the microphone
    #[arg(long, value_name = "PATH")]
    pub wav: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LayoutType::Circle)]
    pub layout: LayoutType,

    #[arg(long, value_enum, default_value_t = Pattern::Direct)]
    pub pattern: Pattern,

    #[arg(long, value_enum, default_value_t = Style::Line)]
    pub style: Style,

    /// Foreground color as #rrggbb
    #[arg(long, value_name = "HEX", default_value = "#00ffff")]
    pub color: Rgb,

    /// Background color as #rrggbb
    #[arg(long, value_name = "HEX", default_value = "#0000ff")]
    pub background: Rgb,

    /// Paint the background color instead of leaving it transparent
    #[arg(long)]
    pub opaque: bool,

    #[arg(long, value_name = "N", default_value_t = 0)]
    pub min_bin: i64,

    #[arg(long, value_name = "N", default_value_t = 255)]
    pub max_bin: i64,

    /// Peak amplitude below which a frame counts as silence (0..=0.01)
    #[arg(long, value_name = "F", default_value_t = 0.001)]
    pub noise_gate: f32,

    /// Weight of the newest spectrum when smoothing; lower is smoother (0..=1)
    #[arg(long, value_name = "F", default_value_t = 0.3)]
    pub smoothing: f32,

    /// Samples per analysis frame
    #[arg(long, value_name = "N", default_value_t = crate::capture::DEFAULT_FRAME_SIZE)]
    pub frame_size: usize,

    /// Ticks per second
    #[arg(long, value_name = "N", default_value_t = 30)]
    pub fps: u32,

    /// Run headless and print one JSON line per tick
    #[arg(long)]
    pub json: bool,

    /// Number of ticks to run in --json mode
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub ticks: usize,
}

impl Args {
    pub fn to_config(&self) -> VisualizationConfig {
        let mut config = VisualizationConfig {
            layout_type: self.layout,
            pattern: self.pattern,
            style: self.style,
            color: self.color,
            background_color: self.background,
            transparent_background: !self.opaque,
            frequency_range: FrequencyRange::clamped(self.min_bin, self.max_bin),
            ..Default::default()
        };
        config.set_noise_gate(self.noise_gate);
        config.set_smoothing_factor(self.smoothing);
        config
    }

    pub fn to_capture(&self) -> CaptureConfig {
        CaptureConfig {
            frame_size: self.frame_size.max(1),
            tick_interval: Duration::from_secs_f64(1.0 / self.fps.max(1) as f64),
            device: self.device.clone().map(DeviceId),
        }
    }

    /// Default log filter when RUST_LOG is unset. Logs go to stderr, which
    /// would scribble over the terminal UI, so interactive mode is silent.
    pub fn log_filter(&self) -> &'static str {
        if self.json || self.list_devices { "info" } else { "off" }
    }

    pub fn input_selection(&self) -> InputSelection {
        if let Some(frequency_hz) = self.tone {
            InputSelection::Tone {
                frequency_hz,
                amplitude: DEFAULT_TONE_AMPLITUDE,
                sample_rate: DEFAULT_TONE_SAMPLE_RATE,
            }
        } else if let Some(path) = &self.wav {
            InputSelection::Wav {
                path: path.clone(),
                looping: true,
            }
        } else {
            InputSelection::Microphone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("visualizer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_match_visualization_defaults() {
        let args = parse(&[]);
        assert_eq!(args.to_config(), VisualizationConfig::default());
        assert!(args.input_selection().is_microphone());
        assert_eq!(args.to_capture().frame_size, 2048);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let args = parse(&[
            "--min-bin", "300", "--max-bin", "900", "--noise-gate", "0.5", "--smoothing=-1",
        ]);
        let cfg = args.to_config();
        assert_eq!(cfg.frequency_range, FrequencyRange { min_bin: 254, max_bin: 255 });
        assert_eq!(cfg.noise_gate, crate::config::NOISE_GATE_MAX);
        assert_eq!(cfg.smoothing_factor, 0.0);
    }

    #[test]
    fn test_enums_and_colors_parse() {
        let args = parse(&[
            "--layout", "histogram", "--pattern", "mirror", "--style", "dot", "--color", "#ff0000",
            "--opaque",
        ]);
        let cfg = args.to_config();
        assert_eq!(cfg.layout_type, LayoutType::Histogram);
        assert_eq!(cfg.pattern, Pattern::Mirror);
        assert_eq!(cfg.style, Style::Dot);
        assert_eq!(cfg.color, Rgb::new(255, 0, 0));
        assert!(!cfg.transparent_background);
    }

    #[test]
    fn test_interactive_mode_keeps_logs_off_screen() {
        assert_eq!(parse(&[]).log_filter(), "off");
        assert_eq!(parse(&["--json"]).log_filter(), "info");
        assert_eq!(parse(&["--list-devices"]).log_filter(), "info");
    }

    #[test]
    fn test_smoothing_help_describes_new_sample_weight() {
        use clap::CommandFactory;

        let cmd = Args::command();
        let help = cmd
            .get_arguments()
            .find(|a| a.get_id() == "smoothing")
            .and_then(|a| a.get_help())
            .map(|h| h.to_string())
            .unwrap();
        assert!(help.contains("newest"));
        assert!(!help.contains("previous"));
    }

    #[test]
    fn test_tone_and_wav_conflict() {
        let result = Args::try_parse_from(["visualizer", "--tone", "440", "--wav", "a.wav"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tone_selection() {
        let args = parse(&["--tone", "440"]);
        assert!(matches!(
            args.input_selection(),
            InputSelection::Tone { frequency_hz, .. } if frequency_hz == 440.0
        ));
    }
}
