//! Effulgent engine crate.
//!
//! A fixed-rate frame loop that drives user drawables through a backend
//! running on its own thread. Two backends ship with the crate: a winit +
//! wgpu window and a headless one with a virtual clock.

pub mod backend;
pub mod coords;
pub mod core;
pub mod engine;
pub mod exec;
pub mod input;
pub mod logging;
pub mod paint;
pub mod time;

mod device;
mod render;

pub use backend::{Backend, HeadlessBackend, WinitBackend};
pub use coords::Point;
pub use crate::core::{Canvas, DrawResult, Drawable};
pub use engine::{CancelToken, EngineConfig, FrameLoop, RunError};
pub use exec::BackendExecutor;
pub use paint::Color;
