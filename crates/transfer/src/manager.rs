use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use playdock_protocol::TransferStats;
use tokio::sync::mpsc;

use crate::TransferError;
use crate::engine::{EngineUpdate, TransferEngine};

/// Buffer size for per-transfer event channels.
const EVENT_BUFFER: usize = 64;

/// Events emitted for one acquisition transfer.
///
/// The stream ends with exactly one terminal variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Progress(TransferStats),
    Done,
    Failed(String),
}

/// Drives one network transfer per item id.
///
/// Sessions are ephemeral and owned here: an id is registered when the
/// transfer starts and released when its terminal event has been decided,
/// so at most one transfer per id is in flight at any time.
pub struct TransferManager {
    engine: Arc<dyn TransferEngine>,
    downloads_root: PathBuf,
    active: Arc<Mutex<HashSet<String>>>,
}

impl TransferManager {
    /// Creates a manager storing per-item downloads under `downloads_root`.
    pub fn new(engine: Arc<dyn TransferEngine>, downloads_root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            downloads_root: downloads_root.into(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns the download directory for an item id.
    pub fn download_dir(&self, item_id: &str) -> PathBuf {
        self.downloads_root.join(item_id)
    }

    /// Starts a transfer and returns its event stream.
    ///
    /// Rejects ids that are empty or unusable as a path segment with
    /// [`TransferError::InvalidIdentifier`], and a second start for an id
    /// already in flight with [`TransferError::AlreadyInProgress`]. The
    /// stream terminates with [`TransferEvent::Done`] after the engine has
    /// been deregistered, or [`TransferEvent::Failed`] otherwise. A dropped
    /// receiver never errors the transfer task; late events are discarded.
    pub async fn start(
        &self,
        locator: &str,
        item_id: &str,
    ) -> Result<mpsc::Receiver<TransferEvent>, TransferError> {
        validate_item_id(item_id)?;

        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if !active.insert(item_id.to_string()) {
                return Err(TransferError::AlreadyInProgress(item_id.to_string()));
            }
        }

        let result = self.register(locator, item_id).await;
        if result.is_err() {
            self.release(item_id);
        }
        result
    }

    async fn register(
        &self,
        locator: &str,
        item_id: &str,
    ) -> Result<mpsc::Receiver<TransferEvent>, TransferError> {
        let dest = self.download_dir(item_id);
        std::fs::create_dir_all(&dest)?;

        let (raw_tx, raw_rx) = mpsc::channel(EVENT_BUFFER);
        self.engine
            .add(locator, &dest, raw_tx)
            .await
            .map_err(TransferError::Engine)?;

        tracing::info!(item_id, locator, "transfer registered");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let engine = Arc::clone(&self.engine);
        let active = Arc::clone(&self.active);
        let locator = locator.to_string();
        let item_id = item_id.to_string();
        tokio::spawn(async move {
            pump(engine, active, locator, item_id, raw_rx, tx).await;
        });

        Ok(rx)
    }

    fn release(&self, item_id: &str) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(item_id);
    }
}

/// Forwards engine updates as normalized events until a terminal variant.
async fn pump(
    engine: Arc<dyn TransferEngine>,
    active: Arc<Mutex<HashSet<String>>>,
    locator: String,
    item_id: String,
    mut raw_rx: mpsc::Receiver<EngineUpdate>,
    tx: mpsc::Sender<TransferEvent>,
) {
    let terminal = loop {
        match raw_rx.recv().await {
            Some(EngineUpdate::Progress(raw)) => {
                let _ = tx.send(TransferEvent::Progress(normalize(raw))).await;
            }
            Some(EngineUpdate::Done) => {
                // Deregister from the engine before the next stage begins.
                match engine.remove(&locator).await {
                    Ok(()) => {
                        tracing::info!(item_id, "transfer complete");
                        break TransferEvent::Done;
                    }
                    Err(e) => {
                        tracing::warn!(item_id, error = %e, "failed to deregister transfer");
                        break TransferEvent::Failed("stop failed".into());
                    }
                }
            }
            Some(EngineUpdate::Error(message)) => {
                tracing::warn!(item_id, error = %message, "transfer failed");
                break TransferEvent::Failed(message);
            }
            None => {
                tracing::warn!(item_id, "engine closed the update stream");
                break TransferEvent::Failed("transfer engine stopped unexpectedly".into());
            }
        }
    };

    // Release the session before delivering the terminal event so a caller
    // observing it can immediately start a fresh transfer for this id.
    {
        let mut active = active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&item_id);
    }
    let _ = tx.send(terminal).await;
}

/// Converts raw engine counters into UI units.
///
/// Percent is two-decimal, NaN fractions collapse to 0, rate becomes KB/s,
/// volumes become MB.
fn normalize(raw: crate::RawProgress) -> TransferStats {
    let fraction = if raw.fraction.is_nan() { 0.0 } else { raw.fraction };
    TransferStats {
        progress: round2(fraction * 100.0),
        download_speed: round2(raw.rate_bytes / 1024.0),
        uploaded: round2(raw.uploaded_bytes as f64 / (1024.0 * 1024.0)),
        peers: raw.peers,
        total_size: round2(raw.total_bytes as f64 / (1024.0 * 1024.0)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The item id doubles as a filesystem path segment, so it must be a plain
/// token: non-empty, no leading dot, only alphanumerics, `-`, `_` and `.`.
fn validate_item_id(item_id: &str) -> Result<(), TransferError> {
    let valid = !item_id.is_empty()
        && !item_id.starts_with('.')
        && item_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(TransferError::InvalidIdentifier(item_id.to_string()))
    }
}
