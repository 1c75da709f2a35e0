use crate::coords::Point;
use crate::paint::Color;

/// Drawing surface handed to drawables during a run.
///
/// Drawing is immediate: every call is forwarded to the backend for the
/// frame in progress. Nothing is retained across frames.
pub trait Canvas {
    /// Window width in pixels, as configured before the run started.
    fn width(&self) -> u32;

    /// Window height in pixels, as configured before the run started.
    fn height(&self) -> u32;

    /// Draws every point in `points` with the same `color`.
    ///
    /// An empty slice issues no backend call.
    fn draw_points(&mut self, points: &[Point], color: Color);
}
