//! Rendering backends.
//!
//! The frame loop never touches a window system directly. It drives a
//! [`Backend`] through a [`BackendExecutor`](crate::exec::BackendExecutor),
//! so every call below runs on the executor thread.

mod headless;
mod windowed;

pub use headless::{BackendCall, HeadlessBackend, Journal};
pub use windowed::WinitBackend;

use anyhow::Result;

use crate::coords::Point;
use crate::input::BackendEvent;
use crate::paint::Color;

/// Window parameters fixed at creation time.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WindowSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Renderer parameters fixed at creation time.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RendererSpec {
    /// Synchronize presentation with the display refresh.
    pub vsync: bool,
}

/// Window, renderer, event and timing primitives used by the frame loop.
///
/// Implementations own at most one window and one renderer at a time.
/// Drawing calls made while no renderer exists return an error.
pub trait Backend {
    fn create_window(&mut self, spec: &WindowSpec) -> Result<()>;

    /// Releases the window, and the renderer first if one is still attached.
    fn destroy_window(&mut self);

    fn create_renderer(&mut self, spec: &RendererSpec) -> Result<()>;

    fn destroy_renderer(&mut self);

    /// Drains every pending window-system event.
    fn poll_events(&mut self) -> Vec<BackendEvent>;

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()>;

    /// Sets the color used by subsequent `clear` and `draw_points` calls.
    fn set_draw_color(&mut self, color: Color);

    /// Starts a new frame filled with the current draw color.
    fn clear(&mut self) -> Result<()>;

    fn draw_points(&mut self, points: &[Point]) -> Result<()>;

    /// Shows the frame built since the last `clear`.
    fn present(&mut self) -> Result<()>;

    /// Monotonic milliseconds since the backend was created.
    fn ticks(&self) -> u64;

    /// Blocks the backend thread for `ms` milliseconds.
    fn delay(&mut self, ms: u64);
}
