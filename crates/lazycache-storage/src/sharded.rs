//! Sharded directory implementation of [`KeyValueStore`].
//!
//! [`ShardedDirStore`] stores the entry for key `k` at
//! `<root>/<k[..2]>/<k[2..]>`, keeping directory sizes bounded for large
//! caches.
//!
//! # Index
//!
//! The store keeps one key set per shard prefix. A shard is scanned from disk
//! the first time any key with its prefix is touched, and from then on the
//! in-memory set is authoritative for that prefix until [`refresh`] drops it.
//! Prefixes with no directory yet get an empty set, which `put` fills in, so
//! entries written to a brand-new shard are visible immediately and after
//! reopening the store.
//!
//! [`refresh`]: KeyValueStore::refresh

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::files::{atomic_write, list_dirs, list_entries, read_entry, remove_entry};
use crate::key::validate_key;
use crate::traits::KeyValueStore;

/// Number of leading key characters that select the shard directory.
pub const SHARD_PREFIX_LEN: usize = 2;

/// One file per key, bucketed by key prefix.
#[derive(Debug)]
pub struct ShardedDirStore {
    root: PathBuf,
    /// Full keys known to exist, per scanned prefix.
    shards: HashMap<String, HashSet<String>>,
}

/// Splits `key` into its shard prefix and the file name inside the shard.
pub fn split_key(key: &str) -> Result<(&str, &str), StorageError> {
    validate_key(key)?;
    if key.len() <= SHARD_PREFIX_LEN {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "sharded keys must be longer than two characters",
        });
    }
    Ok(key.split_at(SHARD_PREFIX_LEN))
}

fn scan_shard(root: &Path, prefix: &str) -> Result<HashSet<String>, StorageError> {
    let names = list_entries(&root.join(prefix))?;
    tracing::debug!(shard = prefix, entries = names.len(), "scanned shard");
    Ok(names
        .into_iter()
        .map(|rest| format!("{prefix}{rest}"))
        .collect())
}

impl ShardedDirStore {
    /// Opens the store rooted at `root`, creating the directory if needed.
    ///
    /// No shard is scanned until it is first used.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        tracing::debug!(root = %root.display(), "opened sharded directory store");
        Ok(ShardedDirStore {
            root,
            shards: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds (or would hold) the entry for `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let (prefix, rest) = split_key(key)?;
        Ok(self.root.join(prefix).join(rest))
    }

    /// Returns the key set for `prefix`, scanning the shard on first use.
    fn shard(&mut self, prefix: &str) -> Result<&mut HashSet<String>, StorageError> {
        match self.shards.entry(prefix.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let scanned = scan_shard(&self.root, prefix)?;
                Ok(entry.insert(scanned))
            }
        }
    }
}

impl KeyValueStore for ShardedDirStore {
    fn contains(&mut self, key: &str) -> Result<bool, StorageError> {
        let (prefix, _) = split_key(key)?;
        Ok(self.shard(prefix)?.contains(key))
    }

    fn get(&mut self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        let (prefix, _) = split_key(key)?;
        let shard = self.shard(prefix)?;
        if !shard.contains(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        match read_entry(&path)? {
            Some(bytes) => Ok(bytes),
            None => {
                shard.remove(key);
                Err(StorageError::NotFound(key.to_string()))
            }
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let (prefix, _) = split_key(key)?;
        let dir = self.root.join(prefix);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        // Scan before writing so the rest of the shard is indexed too.
        self.shard(prefix)?;
        atomic_write(&dir, &path, value)?;
        self.shard(prefix)?.insert(key.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let (prefix, _) = split_key(key)?;
        let existed = remove_entry(&path)?;
        let indexed = self.shard(prefix)?.remove(key);
        if existed || indexed {
            Ok(())
        } else {
            Err(StorageError::NotFound(key.to_string()))
        }
    }

    /// Rescans the whole tree; shards that vanished from disk are dropped.
    fn keys(&mut self) -> Result<BTreeSet<String>, StorageError> {
        let prefixes = list_dirs(&self.root)?;
        let mut shards = HashMap::with_capacity(prefixes.len());
        for prefix in prefixes {
            if prefix.len() != SHARD_PREFIX_LEN {
                continue;
            }
            let scanned = scan_shard(&self.root, &prefix)?;
            shards.insert(prefix, scanned);
        }
        self.shards = shards;
        Ok(self.shards.values().flatten().cloned().collect())
    }

    fn refresh(&mut self) -> Result<(), StorageError> {
        self.shards.clear();
        Ok(())
    }
}
