use serde::{Deserialize, Serialize};

use crate::types::{GameRecord, TransferStats};

/// Events delivered to the UI collaborator.
///
/// The `type` tag values are part of the wire contract with the frontend
/// and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ObserverEvent {
    /// Periodic progress tick for an active network transfer.
    #[serde(rename_all = "camelCase")]
    TransferProgress {
        item_id: String,
        #[serde(flatten)]
        stats: TransferStats,
    },
    /// Terminal failure of the transfer stage.
    #[serde(rename_all = "camelCase")]
    TransferError { item_id: String, message: String },
    /// The decoder subprocess has been spawned.
    #[serde(rename_all = "camelCase")]
    DecompressionStart { item_id: String },
    /// Extraction progress, 0–100, non-decreasing per item.
    #[serde(rename_all = "camelCase")]
    DecompressionProgress { item_id: String, progress: u8 },
    /// Extraction finished and the launchable file was located.
    #[serde(rename_all = "camelCase")]
    DecompressionComplete { item_id: String, exec_path: String },
    /// Terminal failure of the extraction stage.
    #[serde(rename_all = "camelCase")]
    DecompressionError { item_id: String, message: String },
    /// Accumulated playtime changed after a play session.
    #[serde(rename_all = "camelCase")]
    PlaytimeUpdated { item_id: String, playtime: u64 },
    /// The library was (re)loaded from disk.
    #[serde(rename_all = "camelCase")]
    LibraryLoaded { library: Vec<GameRecord> },
}

impl ObserverEvent {
    /// Returns the item id this event concerns, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::TransferProgress { item_id, .. }
            | Self::TransferError { item_id, .. }
            | Self::DecompressionStart { item_id }
            | Self::DecompressionProgress { item_id, .. }
            | Self::DecompressionComplete { item_id, .. }
            | Self::DecompressionError { item_id, .. }
            | Self::PlaytimeUpdated { item_id, .. } => Some(item_id),
            Self::LibraryLoaded { .. } => None,
        }
    }
}
