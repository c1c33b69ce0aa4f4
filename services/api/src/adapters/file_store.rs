//! services/api/src/adapters/file_store.rs
//!
//! The storage adapter: a concrete implementation of the `KeyValueStore` port
//! that keeps each key as one JSON file inside a data directory.
//!
//! Values are written to a temporary file and renamed into place, so readers
//! always see either the old or the new value in full.

use lead_tracker_core::ports::{KeyValueStore, PortError, PortResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed adapter that implements the `KeyValueStore` port.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(PortError::Unexpected(format!("invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("failed to {action} {}: {e}", path.display()))
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| io_error("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error("replace", &path, e))?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).unwrap();
        assert_eq!(store.get("leads").unwrap(), None);
        store.set("leads", "[]").unwrap();
        store.set("leads", "[1]").unwrap();

        let reopened = FileStore::open(dir.path().join("data")).unwrap();
        assert_eq!(reopened.get("leads").unwrap().as_deref(), Some("[1]"));
        assert!(!dir.path().join("data/leads.json.tmp").exists());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("auth_token", "tok").unwrap();
        store.remove("auth_token").unwrap();
        store.remove("auth_token").unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);
    }

    #[rstest]
    #[case("../escape")]
    #[case("a/b")]
    #[case("")]
    #[case(".hidden")]
    fn rejects_keys_outside_the_directory(#[case] key: &str) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(store.set(key, "x"), Err(PortError::Unexpected(_))));
    }
}
