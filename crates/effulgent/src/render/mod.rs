//! GPU rendering for the winit backend.
//!
//! Convention:
//! - CPU geometry is in window pixels (top-left origin, +Y down).
//! - Vertex shader converts to NDC using a viewport uniform.

mod ctx;
mod points;

pub use ctx::{RenderCtx, RenderTarget};
pub use points::PointRenderer;
