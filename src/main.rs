// src/main.rs

use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use serde::Serialize;

use viz_modules::capture::{CaptureConfig, InputSelection, list_input_devices};
use viz_modules::cli::Args;
use viz_modules::config::VisualizationConfig;
use viz_modules::render::{Canvas, DrawCommand, build_scene};
use viz_modules::{TickOutcome, VisualizerPipeline, VizController};

/// Scene size used for headless output.
const HEADLESS_CANVAS: Canvas = Canvas { width: 600.0, height: 400.0 };

#[derive(Serialize)]
struct TickRecord<'a> {
    tick: usize,
    silent: bool,
    levels: &'a [u8],
    commands: Vec<DrawCommand>,
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();

    if args.list_devices {
        return print_devices();
    }

    let config = args.to_config();
    let capture = args.to_capture();
    let input = args.input_selection();

    if args.json {
        run_headless(config, &capture, &input, args.ticks)
    } else {
        run_interactive(config, capture, input)
    }
}

fn print_devices() -> Result<(), anyhow::Error> {
    let devices = list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for d in devices {
        println!(
            "{}{} ({} ch @ {} Hz)",
            if d.is_default { "* " } else { "  " },
            d.id,
            d.channels,
            d.sample_rate
        );
    }
    Ok(())
}

fn run_headless(
    config: VisualizationConfig,
    capture: &CaptureConfig,
    input: &InputSelection,
    ticks: usize,
) -> Result<(), anyhow::Error> {
    let mut source = input.open(capture)?;
    log::info!("Headless run on {} for {} ticks", source.describe(), ticks);

    let mut pipeline = VisualizerPipeline::new(capture.frame_size);
    for tick in 0..ticks {
        let started = Instant::now();
        match pipeline.tick(source.as_mut(), &config) {
            TickOutcome::Updated { silent } => {
                let levels = pipeline.display().levels();
                let record = TickRecord {
                    tick,
                    silent,
                    levels,
                    commands: build_scene(Some(levels), &config, HEADLESS_CANVAS),
                };
                println!("{}", serde_json::to_string(&record)?);
            }
            TickOutcome::Skipped(e) if e.is_transient() => log::warn!("Skipped tick {tick}: {e}"),
            TickOutcome::Skipped(e) => {
                log::error!("Input failed after {tick} ticks: {e}");
                break;
            }
        }

        // Live input paces itself; synthetic sources need the sleep.
        if !input.is_microphone() {
            if let Some(rest) = capture.tick_interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }
    Ok(())
}

fn run_interactive(
    config: VisualizationConfig,
    capture: CaptureConfig,
    input: InputSelection,
) -> Result<(), anyhow::Error> {
    let target_frame_duration = capture.tick_interval;
    let mut viz = VizController::new(config, capture, input);

    let mut stdout = std::io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide, terminal::Clear(terminal::ClearType::All))?;

    let result = event_loop(&mut viz, target_frame_duration);

    viz.stop();
    execute!(stdout, Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    println!("Exiting visualizer.");
    result
}

fn event_loop(viz: &mut VizController, target_frame_duration: Duration) -> Result<(), anyhow::Error> {
    // Start listening right away; failures land in the status line.
    let _ = viz.start();
    viz.run_tick()?;

    let mut next_tick = Instant::now() + target_frame_duration;
    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(ev) if ev.kind == KeyEventKind::Press => {
                    if viz.should_quit(ev.code, ev.modifiers) {
                        break;
                    }
                    viz.handle_key(ev.code, ev.modifiers);
                }
                Event::Resize(..) => {
                    execute!(std::io::stdout(), terminal::Clear(terminal::ClearType::All))?;
                    viz.request_redraw();
                }
                _ => {}
            }
            // Keys only flag a redraw; the frame happens on schedule.
            if Instant::now() < next_tick {
                continue;
            }
        }

        viz.run_tick()?;
        next_tick += target_frame_duration;
        // Fell behind (slow terminal); don't try to catch up in a burst.
        let now = Instant::now();
        if next_tick < now {
            next_tick = now + target_frame_duration;
        }
    }
    Ok(())
}
