//! Archive extraction stage of the acquisition pipeline.
//!
//! The decoder is an external subprocess treated as a black box: this
//! crate selects the archive, supervises the process, scrapes a monotonic
//! percentage out of its console output, verifies the result and locates
//! the launchable file in the extracted tree.

mod extract;
mod progress;
pub mod scan;

pub use extract::{ARCHIVE_EXT, EXTRACT_DIR, UnpackEvent, Unpacker};
pub use progress::{MonotonicPercent, parse_percent};

/// Errors produced by the extraction stage.
#[derive(Debug, thiserror::Error)]
pub enum UnpackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no archive found")]
    NoArchive,

    #[error("failed to spawn decoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("extraction failed, code {0}")]
    DecoderExit(i32),

    #[error("no files after extraction")]
    EmptyExtraction,

    #[error("target executable not found")]
    ExecutableNotFound,
}
