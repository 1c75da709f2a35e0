//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Backends translate platform events into `BackendEvent`s.

mod key;
pub(crate) mod platform;

pub use key::{BackendEvent, Key};
