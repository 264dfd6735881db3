use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single entry in the user's game library.
///
/// Only `id`, `playtime` and `executable` are meaningful to the pipeline.
/// Whatever else the UI stores per game (title, artwork paths, size
/// strings, ...) is carried opaquely in `extra` and round-trips untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    /// Accumulated play time in seconds.
    #[serde(default)]
    pub playtime: u64,
    /// File name of the launchable binary inside the extracted tree.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub executable: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GameRecord {
    /// Creates a bare record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            playtime: 0,
            executable: String::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Profile owner information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default = "default_user_name")]
    pub name: String,
    #[serde(default)]
    pub level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default)]
    pub expositors: Vec<serde_json::Value>,
}

fn default_user_name() -> String {
    "Player".into()
}

impl Default for UserInfo {
    fn default() -> Self {
        Self {
            name: default_user_name(),
            level: 0,
            picture: None,
            expositors: Vec::new(),
        }
    }
}

/// Where an acquired item ended up on disk.
///
/// Committed only after extraction succeeded and the launchable file was
/// located; looked up again at launch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRecord {
    /// Absolute path of the extracted root directory.
    pub path: String,
    /// Absolute path of the discovered launchable file.
    pub exec_target: String,
}

/// The persisted user profile.
///
/// `extraction_paths` is kept ordered so the serialized form is stable
/// across save cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub library: Vec<GameRecord>,
    #[serde(default)]
    pub user: UserInfo,
    /// Item id → install record.
    #[serde(default, rename = "extractionPaths")]
    pub extraction_paths: BTreeMap<String, InstallRecord>,
}

impl Profile {
    /// Returns the library record for an item id, if present.
    pub fn record(&self, item_id: &str) -> Option<&GameRecord> {
        self.library.iter().find(|r| r.id == item_id)
    }

    /// Mutable variant of [`record`](Self::record).
    pub fn record_mut(&mut self, item_id: &str) -> Option<&mut GameRecord> {
        self.library.iter_mut().find(|r| r.id == item_id)
    }
}

/// Normalized statistics for one transfer progress tick.
///
/// Units follow the UI contract: percent with two-decimal precision,
/// KB/s for rate, MB for volumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStats {
    /// Completion percentage, 0–100.
    pub progress: f64,
    /// Download rate in KB/s.
    pub download_speed: f64,
    /// Cumulative uploaded data in MB.
    pub uploaded: f64,
    /// Connected peer count.
    pub peers: u32,
    /// Total transfer size in MB.
    pub total_size: f64,
}

/// Reply to a UI command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl CommandReply {
    /// A successful reply with no message.
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    /// A failed reply carrying a human-readable reason.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for CommandReply {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}
