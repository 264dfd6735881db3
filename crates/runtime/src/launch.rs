use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use playdock_profile::ProfileStore;
use tokio::process::Command;

use crate::LaunchError;

/// Result of one launch attempt.
#[derive(Debug)]
pub struct LaunchOutcome {
    /// The child process result: `Ok` on a clean exit.
    pub result: Result<(), LaunchError>,
    /// Measured session length in whole seconds.
    pub session_seconds: u64,
    /// Total persisted playtime after the fold. `None` when the library
    /// has no record for the item (nothing was updated).
    pub playtime: Option<u64>,
}

/// Launches installed games and accounts their playtime.
pub struct GameRuntime {
    store: Arc<ProfileStore>,
}

impl GameRuntime {
    pub fn new(store: Arc<ProfileStore>) -> Self {
        Self { store }
    }

    /// Launches the installed executable for `item_id` and waits for it to
    /// exit.
    ///
    /// The working directory is set to the executable's own folder so the
    /// game can resolve its relative resources. Whatever the exit status,
    /// the measured session is folded into the profile before returning;
    /// the outcome's `result` reflects only the child process itself.
    pub async fn launch(&self, item_id: &str) -> LaunchOutcome {
        let profile = self.store.load();
        let exec_target = profile
            .extraction_paths
            .get(item_id)
            .map(|record| record.exec_target.clone())
            .filter(|target| !target.is_empty());

        let Some(exec_target) = exec_target else {
            tracing::warn!(item_id, "launch requested for item without install record");
            return LaunchOutcome {
                result: Err(LaunchError::NotInstalled),
                session_seconds: 0,
                playtime: None,
            };
        };

        let exec = Path::new(&exec_target);
        let work_dir = exec.parent().unwrap_or_else(|| Path::new("."));

        tracing::info!(item_id, exec = %exec.display(), "launching");
        let started = Instant::now();
        let result = match Command::new(exec).current_dir(work_dir).status().await {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(LaunchError::Exit(status.code().unwrap_or(-1))),
            Err(e) => Err(LaunchError::Spawn(e)),
        };
        let session_seconds = started.elapsed().as_secs_f64().round() as u64;

        if let Err(e) = &result {
            tracing::warn!(item_id, error = %e, "game session ended with error");
        }

        let playtime = self.record_session(item_id, session_seconds).await;

        LaunchOutcome {
            result,
            session_seconds,
            playtime,
        }
    }

    /// Adds a measured session to the item's persisted playtime.
    ///
    /// Returns the new total, or `None` when the library has no record for
    /// the item — a missing record is logged and skipped, never created.
    pub async fn record_session(&self, item_id: &str, seconds: u64) -> Option<u64> {
        let mut total = None;
        self.store
            .update(|profile| match profile.record_mut(item_id) {
                Some(record) => {
                    record.playtime += seconds;
                    total = Some(record.playtime);
                }
                None => {
                    tracing::warn!(item_id, "no library record for played item, playtime dropped");
                }
            })
            .await;

        if let Some(total) = total {
            tracing::info!(item_id, seconds, total, "playtime recorded");
        }
        total
    }

    /// Returns the persisted playtime for an item, 0 when unknown.
    pub fn playtime(&self, item_id: &str) -> u64 {
        self.store
            .load()
            .record(item_id)
            .map(|record| record.playtime)
            .unwrap_or(0)
    }
}
