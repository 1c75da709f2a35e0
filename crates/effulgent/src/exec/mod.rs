//! Backend-affine execution.
//!
//! All backend work is funneled through one dedicated thread so that
//! window-system calls never migrate between threads.

mod executor;

pub use executor::{BackendExecutor, ExecutorError};
