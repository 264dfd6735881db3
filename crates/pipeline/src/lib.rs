//! Acquisition orchestrator.
//!
//! Turns a single start request into the per-item stage chain — network
//! transfer, archive extraction, executable discovery, install-record
//! commit — and forwards progress and terminal outcomes to the observer
//! channel. Launching an installed item is a separate entry point sharing
//! the same profile store.

mod orchestrator;

pub use orchestrator::{Pipeline, PipelineConfig};

use playdock_runtime::LaunchError;
use playdock_transfer::TransferError;

/// Errors returned directly from pipeline commands.
///
/// Stage failures inside a running acquisition are not errors here; they
/// surface as observer events instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("acquisition already in progress for {0}")]
    AlreadyInProgress(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}
