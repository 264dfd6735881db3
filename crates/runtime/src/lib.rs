//! Game launch and playtime accounting.
//!
//! Launches a previously installed executable, measures the wall-clock
//! session length and folds it into the persisted profile — also when the
//! game itself exits with an error.

mod launch;

pub use launch::{GameRuntime, LaunchOutcome};

/// Errors describing a failed launch.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("executable not found")]
    NotInstalled,

    #[error("failed to start process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("process exited with code {0}")]
    Exit(i32),
}
