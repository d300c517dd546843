// src/render/mod.rs
pub mod scene;
pub mod terminal;

pub use scene::{Canvas, DrawCommand, build_scene};
pub use terminal::TerminalCanvas;
