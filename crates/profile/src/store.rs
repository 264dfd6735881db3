use std::path::{Path, PathBuf};

use playdock_protocol::Profile;
use tokio::sync::Mutex;

/// File name of the persisted profile inside the store directory.
pub const PROFILE_FILE: &str = "profile.json";

/// Owns the persisted profile and the install-record table embedded in it.
///
/// All cross-task mutation must go through [`update`](Self::update), which
/// serializes load → mutate → save sequences so near-simultaneous
/// completions of different items cannot lose each other's writes.
pub struct ProfileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProfileStore {
    /// Creates a store persisting to `profile.json` under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(PROFILE_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the persisted file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the profile from disk. Never fails.
    ///
    /// A missing or empty file yields the default profile. A file that
    /// parses but is not shaped like a profile (root not an object,
    /// `library` not an array, `user` not an object) is logged and
    /// replaced by the default as well. Absent numeric and array fields
    /// are back-filled during deserialization.
    pub fn load(&self) -> Profile {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Profile::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "profile unreadable");
                return Profile::default();
            }
        };

        if raw.trim().is_empty() {
            return Profile::default();
        }

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "profile is not valid JSON");
                return Profile::default();
            }
        };

        if !is_profile_shaped(&value) {
            tracing::warn!(path = %self.path.display(), "profile is structurally invalid");
            return Profile::default();
        }

        match serde_json::from_value(value) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "profile failed to deserialize");
                Profile::default()
            }
        }
    }

    /// Persists the profile, pretty-printed.
    ///
    /// The write goes to a sibling temp file which is then renamed over the
    /// target, so a concurrent [`load`](Self::load) never observes a partial
    /// write. Failures are logged and swallowed: acquisition and launch
    /// flows must not abort because persistence failed.
    pub fn save(&self, profile: &Profile) {
        if let Err(e) = self.try_save(profile) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to save profile");
        }
    }

    fn try_save(&self, profile: &Profile) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(profile).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "profile saved");
        Ok(())
    }

    /// Runs a load → mutate → save sequence under the store's lock and
    /// returns the profile as persisted.
    pub async fn update<F>(&self, mutate: F) -> Profile
    where
        F: FnOnce(&mut Profile),
    {
        let _guard = self.write_lock.lock().await;
        let mut profile = self.load();
        mutate(&mut profile);
        self.save(&profile);
        profile
    }
}

/// Structural validation applied before deserializing.
///
/// Keys are allowed to be absent (defaults fill them in), but a present
/// key with the wrong shape invalidates the whole file.
fn is_profile_shaped(value: &serde_json::Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.get("library")
        .map_or(true, serde_json::Value::is_array)
        && obj.get("user").map_or(true, serde_json::Value::is_object)
        && obj
            .get("extractionPaths")
            .map_or(true, serde_json::Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playdock_protocol::{GameRecord, InstallRecord};

    fn store_in(dir: &tempfile::TempDir) -> ProfileStore {
        ProfileStore::new(dir.path())
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let profile = store.load();
        assert!(profile.library.is_empty());
        assert_eq!(profile.user.name, "Player");
    }

    #[test]
    fn load_empty_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "   \n").unwrap();
        assert_eq!(store.load(), Profile::default());
    }

    #[test]
    fn load_structurally_invalid_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for bad in [
            "[1, 2, 3]",
            "\"not a profile\"",
            r#"{"library": 42}"#,
            r#"{"user": "nope"}"#,
            r#"{"extractionPaths": []}"#,
            "{ broken",
        ] {
            std::fs::write(store.path(), bad).unwrap();
            assert_eq!(store.load(), Profile::default(), "input: {bad}");
        }
    }

    #[test]
    fn load_backfills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"library":[{"id":"g1","name":"Game One"}],"user":{"name":"Ana"}}"#,
        )
        .unwrap();

        let profile = store.load();
        assert_eq!(profile.library.len(), 1);
        assert_eq!(profile.library[0].playtime, 0);
        assert_eq!(profile.user.name, "Ana");
        assert_eq!(profile.user.level, 0);
        assert!(profile.user.expositors.is_empty());
        assert!(profile.extraction_paths.is_empty());
    }

    #[test]
    fn save_load_roundtrip_preserves_opaque_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut record = GameRecord::new("terraria-1");
        record.playtime = 300;
        record.executable = "Terraria.exe".into();
        record
            .extra
            .insert("name".into(), serde_json::Value::from("Terraria"));
        record
            .extra
            .insert("sizeOnDisk".into(), serde_json::Value::from("450 MB"));

        let mut profile = Profile::default();
        profile.library.push(record);
        profile.extraction_paths.insert(
            "terraria-1".into(),
            InstallRecord {
                path: "/downloads/terraria-1/extracted".into(),
                exec_target: "/downloads/terraria-1/extracted/Terraria.exe".into(),
            },
        );

        store.save(&profile);
        let loaded = store.load();
        assert_eq!(loaded, profile);

        // save(load()) is a no-op on a well-formed profile.
        store.save(&loaded);
        assert_eq!(store.load(), profile);
    }

    #[test]
    fn save_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&Profile::default());
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains('\n'));
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("nested").join("state"));
        store.save(&Profile::default());
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn update_persists_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut profile = Profile::default();
        profile.library.push(GameRecord::new("g1"));
        store.save(&profile);

        let updated = store
            .update(|p| {
                p.record_mut("g1").unwrap().playtime += 5;
            })
            .await;
        assert_eq!(updated.record("g1").unwrap().playtime, 5);
        assert_eq!(store.load().record("g1").unwrap().playtime, 5);
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut profile = Profile::default();
        profile.library.push(GameRecord::new("g1"));
        store.save(&profile);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update(|p| {
                        p.record_mut("g1").unwrap().playtime += 1;
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load().record("g1").unwrap().playtime, 10);
    }
}
