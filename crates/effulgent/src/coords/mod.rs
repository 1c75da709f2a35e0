//! Geometry types handed from drawables to the canvas.
//!
//! Canonical space:
//! - window pixels, integer
//! - origin top-left
//! - +X right, +Y down

mod point;

pub use point::Point;
