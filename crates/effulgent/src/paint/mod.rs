//! Color model for point drawing.

mod color;

pub use color::Color;
