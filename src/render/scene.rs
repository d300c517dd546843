// src/render/scene.rs

use std::f32::consts::TAU;

use serde::Serialize;

use crate::analysis::SPECTRUM_BINS;
use crate::analysis::envelope::FULL_SCALE;
use crate::config::{LayoutType, Pattern, Rgb, Style, VisualizationConfig};

/// Radius of the marker drawn in dot style.
pub const DOT_RADIUS: f32 = 2.0;

/// Fraction of the canvas left empty on each side in histogram layout.
const HISTOGRAM_MARGIN: f32 = 0.1;
/// Fraction of the canvas the bars may span.
const HISTOGRAM_EXTENT: f32 = 0.8;
/// Bars fill this fraction of their slot.
const BAR_FILL: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn center(&self) -> (f32, f32) {
        ((self.width / 2.0).floor(), (self.height / 2.0).floor())
    }

    /// Radius of the base circle in circle layout.
    pub fn base_radius(&self) -> f32 {
        let (cx, cy) = self.center();
        (cx.min(cy) / 3.0).floor()
    }
}

/// Primitive the external renderer turns into pixels (or cells).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Erase the canvas; `None` means leave it transparent.
    Clear { background: Option<Rgb> },
    /// Outline of the base circle.
    Circle { cx: f32, cy: f32, radius: f32, color: Rgb },
    Line { x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb },
    /// Filled bar, `y` is the top edge.
    Rect { x: f32, y: f32, width: f32, height: f32, color: Rgb },
    Dot { cx: f32, cy: f32, radius: f32, color: Rgb },
}

/// Build the draw list for one frame. `levels` are the rounded display
/// values; pass `None` when the stream is stopped to draw only the
/// background and, in circle layout, the base circle.
pub fn build_scene(
    levels: Option<&[u8]>,
    config: &VisualizationConfig,
    canvas: Canvas,
) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(SPECTRUM_BINS + 2);
    commands.push(DrawCommand::Clear {
        background: (!config.transparent_background).then_some(config.background_color),
    });

    if config.layout_type == LayoutType::Circle {
        let (cx, cy) = canvas.center();
        commands.push(DrawCommand::Circle {
            cx,
            cy,
            radius: canvas.base_radius(),
            color: config.color,
        });
    }

    let Some(levels) = levels else {
        return commands;
    };

    match (config.layout_type, config.pattern) {
        (LayoutType::Circle, _) => circle(&mut commands, levels, config, canvas),
        (LayoutType::Histogram, Pattern::Direct) => {
            histogram(&mut commands, levels, config, canvas)
        }
        // The upper half duplicates the lower half.
        (LayoutType::Histogram, Pattern::Mirror) => {
            let half = levels.len() / 2;
            histogram(&mut commands, &levels[..half], config, canvas)
        }
    }
    commands
}

fn circle(out: &mut Vec<DrawCommand>, levels: &[u8], config: &VisualizationConfig, canvas: Canvas) {
    let (cx, cy) = canvas.center();
    let radius = canvas.base_radius();
    let count = levels.len() as f32;

    for (i, &level) in levels.iter().enumerate() {
        let angle = i as f32 / count * TAU;
        let (sin, cos) = angle.sin_cos();
        let outer = radius + level as f32 / 3.0;
        let x2 = cx + outer * cos;
        let y2 = cy + outer * sin;

        out.push(match config.style {
            Style::Line => DrawCommand::Line {
                x1: cx + radius * cos,
                y1: cy + radius * sin,
                x2,
                y2,
                color: config.color,
            },
            Style::Dot => DrawCommand::Dot {
                cx: x2,
                cy: y2,
                radius: DOT_RADIUS,
                color: config.color,
            },
        });
    }
}

fn histogram(
    out: &mut Vec<DrawCommand>,
    levels: &[u8],
    config: &VisualizationConfig,
    canvas: Canvas,
) {
    if levels.is_empty() {
        return;
    }
    let bar_width = canvas.width * HISTOGRAM_EXTENT / levels.len() as f32;
    let margin_x = canvas.width * HISTOGRAM_MARGIN;
    let margin_y = canvas.height * HISTOGRAM_MARGIN;
    let max_height = canvas.height * HISTOGRAM_EXTENT;

    for (i, &level) in levels.iter().enumerate() {
        let height = level as f32 / FULL_SCALE * max_height;
        let x = margin_x + i as f32 * bar_width;
        let y = canvas.height - margin_y - height;

        out.push(match config.style {
            Style::Line => DrawCommand::Rect {
                x,
                y,
                width: (bar_width * BAR_FILL).max(1.0),
                height,
                color: config.color,
            },
            Style::Dot => DrawCommand::Dot {
                cx: x + bar_width / 2.0,
                cy: y,
                radius: DOT_RADIUS,
                color: config.color,
            },
        });
    }
}
