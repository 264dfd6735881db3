//! Trait seam over the black-box peer-to-peer transfer engine.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tokio::sync::mpsc;

/// Raw per-tick counters as reported by the engine.
///
/// Everything is in engine-native units (bytes, fractions); normalization
/// into UI units happens in the manager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawProgress {
    /// Completed fraction in `[0, 1]`. May be NaN before the engine has
    /// resolved metadata.
    pub fraction: f64,
    /// Current download rate in bytes per second.
    pub rate_bytes: f64,
    /// Cumulative uploaded bytes.
    pub uploaded_bytes: u64,
    /// Connected peer count.
    pub peers: u32,
    /// Total transfer size in bytes.
    pub total_bytes: u64,
}

/// Updates pushed by the engine for one registered transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    Progress(RawProgress),
    Done,
    Error(String),
}

/// Abstract peer-to-peer transfer engine.
///
/// Production code adapts a real engine behind this trait; tests drive the
/// manager with canned update sequences.
pub trait TransferEngine: Send + Sync {
    /// Registers a transfer for `locator`, writing payload data into
    /// `download_dir` and streaming updates until a terminal
    /// [`EngineUpdate::Done`] or [`EngineUpdate::Error`].
    fn add(
        &self,
        locator: &str,
        download_dir: &Path,
        updates: mpsc::Sender<EngineUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>>;

    /// Deregisters a transfer previously added for `locator`.
    fn remove(&self, locator: &str) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>>;
}
