//! aquarelle — a wet-on-wet watercolor brush engine.
//!
//! The simulation core lives in [`engine`] (the field store) and [`ops`]
//! (the per-sample pipeline: pigment distribution, diffusion, step tracking,
//! edge accumulation, compositing).  The host feeds pointer samples through
//! [`engine::WatercolorEngine::on_press`] / `on_drag` / `on_release` and
//! drains the queued samples once per frame with `process_pending_points`.

#![allow(dead_code)] // API surface kept for hosts beyond the bundled shell

pub mod canvas;
pub mod color;
pub mod engine;
pub mod logger;
pub mod ops;
pub mod params;

pub use canvas::PixelSurface;
pub use engine::WatercolorEngine;
pub use params::{DiffusionMode, WatercolorParams};
