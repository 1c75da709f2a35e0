use std::fmt;

use crate::exec::ExecutorError;

/// Drawable lifecycle call that failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Init,
    Draw,
    Update,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "init",
            Phase::Draw => "draw",
            Phase::Update => "update",
        })
    }
}

/// Why a run ended abnormally.
#[derive(Debug)]
pub enum RunError {
    /// The backend could not create the window. Nothing else was attempted.
    WindowCreation(anyhow::Error),
    /// The backend could not create the renderer. The window was released.
    RendererCreation(anyhow::Error),
    /// A drawable returned an error; the loop stopped right there.
    Drawable {
        index: usize,
        phase: Phase,
        error: anyhow::Error,
    },
    /// This engine already ran. A new engine is needed for another run.
    AlreadyRun,
    /// The backend executor went away mid-run.
    Executor(ExecutorError),
}

impl RunError {
    /// Process-style status code for this failure.
    ///
    /// `0` is reserved for a normal quit and never returned here.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::WindowCreation(_) => 1,
            RunError::RendererCreation(_) => 2,
            RunError::Drawable { .. } => 3,
            RunError::AlreadyRun | RunError::Executor(_) => 4,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::WindowCreation(e) => write!(f, "failed to create window: {e:#}"),
            RunError::RendererCreation(e) => write!(f, "failed to create renderer: {e:#}"),
            RunError::Drawable {
                index,
                phase,
                error,
            } => write!(f, "drawable #{index} failed during {phase}: {error:#}"),
            RunError::AlreadyRun => f.write_str("frame loop has already run"),
            RunError::Executor(e) => write!(f, "backend executor failed: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::WindowCreation(e)
            | RunError::RendererCreation(e)
            | RunError::Drawable { error: e, .. } => Some(&**e),
            RunError::Executor(e) => Some(e),
            RunError::AlreadyRun => None,
        }
    }
}

impl From<ExecutorError> for RunError {
    fn from(e: ExecutorError) -> Self {
        RunError::Executor(e)
    }
}
