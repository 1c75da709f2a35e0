//! The frame loop engine.
//!
//! Owns the drawable list and the run state machine:
//! `Uninitialized -> Created -> Running -> Terminating -> Destroyed`.

mod cancel;
mod config;
mod error;
mod frame_loop;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use error::{Phase, RunError};
pub use frame_loop::{EngineState, FrameLoop};
