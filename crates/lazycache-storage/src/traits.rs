//! The [`KeyValueStore`] trait defining the storage contract for cached
//! results.
//!
//! Keys are the lowercase hex form of a node fingerprint; values are the
//! bytes produced by a codec. All methods take `&mut self` because directory
//! backends maintain an in-memory key index that reads may repair.
//!
//! All backends (InMemoryStore, DirStore, ShardedDirStore, SqliteStore)
//! implement this trait, so the evaluation engine can swap them freely.

use std::collections::BTreeSet;

use crate::error::StorageError;

/// The storage contract for fingerprint-keyed byte entries.
///
/// The trait is synchronous: a store is owned by one factory and used from a
/// single thread.
pub trait KeyValueStore {
    /// Reports whether an entry exists for `key`.
    fn contains(&mut self, key: &str) -> Result<bool, StorageError>;

    /// Returns the stored bytes for `key`.
    ///
    /// Fails with [`StorageError::NotFound`] when no entry exists.
    fn get(&mut self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Stores `value` under `key`, replacing any previous entry.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Removes the entry for `key`.
    ///
    /// Fails with [`StorageError::NotFound`] when no entry exists.
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;

    /// Lists every key currently held by the store.
    fn keys(&mut self) -> Result<BTreeSet<String>, StorageError>;

    /// Drops any cached index so the next access observes external changes.
    fn refresh(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Number of entries.
    fn len(&mut self) -> Result<usize, StorageError> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&mut self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn contains(&mut self, key: &str) -> Result<bool, StorageError> {
        (**self).contains(key)
    }

    fn get(&mut self, key: &str) -> Result<Vec<u8>, StorageError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn keys(&mut self) -> Result<BTreeSet<String>, StorageError> {
        (**self).keys()
    }

    fn refresh(&mut self) -> Result<(), StorageError> {
        (**self).refresh()
    }

    fn len(&mut self) -> Result<usize, StorageError> {
        (**self).len()
    }
}
