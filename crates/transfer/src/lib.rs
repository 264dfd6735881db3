//! Network transfer stage of the acquisition pipeline.
//!
//! The peer-to-peer engine itself is a black box behind the
//! [`TransferEngine`] trait; this crate drives one transfer per item id,
//! normalizes the engine's raw counters into UI units, and reports a
//! terminal [`TransferEvent::Done`] or [`TransferEvent::Failed`] exactly
//! once per transfer.

mod engine;
mod manager;

pub use engine::{EngineUpdate, RawProgress, TransferEngine};
pub use manager::{TransferEvent, TransferManager};

/// Errors produced when starting a transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid item id: {0:?}")]
    InvalidIdentifier(String),

    #[error("transfer already in progress for {0}")]
    AlreadyInProgress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine error: {0}")]
    Engine(String),
}
