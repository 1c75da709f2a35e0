//! Time subsystem.
//!
//! Frame pacing arithmetic, kept independent from any backend clock so it
//! can be tested without a window.

mod frame_pacer;

pub use frame_pacer::FramePacer;
