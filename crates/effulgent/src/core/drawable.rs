use super::canvas::Canvas;

/// Result of a drawable lifecycle call.
///
/// Returning `Err` stops the run after the current call; the engine releases
/// its window and renderer and reports the failure from `run`.
pub type DrawResult = anyhow::Result<()>;

/// Content driven by the frame loop.
///
/// Call order for one run:
/// - `init` once per drawable, in registration order, before the first frame
/// - per frame, for each drawable in registration order: `draw`, then `update`
///
/// Drawables are visited one at a time: drawable `i` receives both `draw` and
/// `update` before drawable `i + 1` receives `draw`.
pub trait Drawable {
    /// Called once after the window and renderer exist.
    fn init(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        Ok(())
    }

    /// Called once per frame after the frame was cleared.
    fn draw(&mut self, canvas: &mut dyn Canvas) -> DrawResult;

    /// Called once per frame, right after this drawable's `draw`.
    fn update(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        Ok(())
    }
}
