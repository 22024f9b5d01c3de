//! # File Storage
//!
//! Stores each key as `<dir>/<key>.json`. Writes go through a temp file in the
//! same directory followed by a rename so a crash never leaves a half-written
//! snapshot behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::KeyValueStorage;

/// Subdirectory used under the platform data dir.
const DEFAULT_DIR_NAME: &str = "cat-voting";

/// A `KeyValueStorage` rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`. The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage under the platform's local data directory, falling back to the
    /// working directory when the platform has none.
    pub fn default_location() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(DEFAULT_DIR_NAME))
    }

    /// The root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9_-]` become `_`, so
    /// keys differing only there (`a.b`, `a_b`) share one file.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");

        let written = write_synced(&tmp, value).and_then(|()| fs::rename(&tmp, &target));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(error = %cleanup, "Failed to remove {}", tmp.display());
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_synced(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get("cat-voting-storage").unwrap(), None);

        storage.set("cat-voting-storage", "{\"state\":{}}").unwrap();
        assert_eq!(
            storage.get("cat-voting-storage").unwrap().as_deref(),
            Some("{\"state\":{}}")
        );

        storage.set("cat-voting-storage", "second").unwrap();
        assert_eq!(storage.get("cat-voting-storage").unwrap().as_deref(), Some("second"));

        storage.remove("cat-voting-storage").unwrap();
        assert_eq!(storage.get("cat-voting-storage").unwrap(), None);
        // Removing twice is fine.
        storage.remove("cat-voting-storage").unwrap();
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set("../outside", "x").unwrap();
        assert!(dir.path().join("___outside.json").is_file());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        // A non-empty directory where the target file belongs makes the
        // rename fail.
        let blocker = dir.path().join("k.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("inside"), "x").unwrap();

        assert!(matches!(storage.set("k", "v"), Err(StorageError::Io(_))));
        assert!(!dir.path().join("k.json.tmp").exists());
        assert!(blocker.join("inside").is_file());
    }
}
