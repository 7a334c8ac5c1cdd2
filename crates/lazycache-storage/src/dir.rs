//! Flat directory implementation of [`KeyValueStore`].
//!
//! [`DirStore`] writes each entry to `<root>/<key>`. The set of keys is read
//! once when the store is opened and kept current by this store's own writes;
//! [`KeyValueStore::refresh`] rescans the directory to pick up files written
//! by other processes.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::files::{atomic_write, list_entries, read_entry, remove_entry};
use crate::key::validate_key;
use crate::traits::KeyValueStore;

/// One file per key in a single directory.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
    index: HashSet<String>,
}

impl DirStore {
    /// Opens the store rooted at `root`, creating the directory if needed and
    /// indexing the entries already present.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        let index = list_entries(&root)?;
        tracing::debug!(root = %root.display(), entries = index.len(), "opened directory store");
        Ok(DirStore { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds (or would hold) the entry for `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl KeyValueStore for DirStore {
    fn contains(&mut self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.index.contains(key))
    }

    fn get(&mut self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        if !self.index.contains(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        match read_entry(&path)? {
            Some(bytes) => Ok(bytes),
            None => {
                // Removed behind our back.
                self.index.remove(key);
                Err(StorageError::NotFound(key.to_string()))
            }
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        atomic_write(&self.root, &path, value)?;
        self.index.insert(key.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let existed = remove_entry(&path)?;
        let indexed = self.index.remove(key);
        if existed || indexed {
            Ok(())
        } else {
            Err(StorageError::NotFound(key.to_string()))
        }
    }

    fn keys(&mut self) -> Result<BTreeSet<String>, StorageError> {
        Ok(self.index.iter().cloned().collect())
    }

    fn refresh(&mut self) -> Result<(), StorageError> {
        self.index = list_entries(&self.root)?;
        Ok(())
    }

    fn len(&mut self) -> Result<usize, StorageError> {
        Ok(self.index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("cache");
        let store = DirStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[test]
    fn put_writes_file_named_by_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        store.put("abc123", b"payload").unwrap();

        let path = tmp.path().join("abc123");
        assert_eq!(fs::read(&path).unwrap(), b"payload");
        assert_eq!(store.path_for("abc123").unwrap(), path);
    }

    #[test]
    fn open_skips_temporary_and_hidden_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(".tmpXYZ"), b"partial").unwrap();
        fs::write(tmp.path().join("good"), b"ok").unwrap();
        fs::create_dir(tmp.path().join("subdir")).unwrap();

        let mut store = DirStore::open(tmp.path()).unwrap();
        let keys: Vec<String> = store.keys().unwrap().into_iter().collect();
        assert_eq!(keys, vec!["good".to_string()]);
    }

    #[test]
    fn file_removed_externally_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        store.put("gone", b"x").unwrap();
        fs::remove_file(tmp.path().join("gone")).unwrap();

        assert!(store.get("gone").unwrap_err().is_not_found());
        // The index was repaired by the failed read.
        assert!(!store.contains("gone").unwrap());
    }

    #[test]
    fn refresh_sees_external_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        fs::write(tmp.path().join("late"), b"1").unwrap();
        assert!(!store.contains("late").unwrap());

        store.refresh().unwrap();
        assert!(store.contains("late").unwrap());
        assert_eq!(store.get("late").unwrap(), b"1");
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.put("../escape", b"x"),
            Err(StorageError::InvalidKey { .. })
        ));
        assert!(matches!(
            store.contains(""),
            Err(StorageError::InvalidKey { .. })
        ));
    }
}
