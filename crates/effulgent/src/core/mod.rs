//! Core engine-facing contracts.
//!
//! This module defines the interface between the frame loop and user content:
//! drawables receive lifecycle calls and draw through a canvas.

mod canvas;
mod drawable;

pub use canvas::Canvas;
pub use drawable::{DrawResult, Drawable};
