//! In-memory implementation of [`KeyValueStore`].
//!
//! [`InMemoryStore`] keeps entries in a `HashMap` for the lifetime of the
//! process. It backs the memoizing factory preset and serves as the reference
//! backend in tests.

use std::collections::{BTreeSet, HashMap};

use crate::error::StorageError;
use crate::traits::KeyValueStore;

/// A `HashMap`-backed store. Any string is a valid key.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn contains(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.contains_key(key))
    }

    fn get(&mut self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn keys(&mut self) -> Result<BTreeSet<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn len(&mut self) -> Result<usize, StorageError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let mut store = InMemoryStore::new();
        assert!(!store.contains("k").unwrap());

        store.put("k", b"v1").unwrap();
        assert!(store.contains("k").unwrap());
        assert_eq!(store.get("k").unwrap(), b"v1");

        store.put("k", b"v2").unwrap();
        assert_eq!(store.get("k").unwrap(), b"v2");
        assert_eq!(store.len().unwrap(), 1);

        store.delete("k").unwrap();
        assert!(!store.contains("k").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn missing_key_is_not_found() {
        let mut store = InMemoryStore::new();
        assert!(store.get("nope").unwrap_err().is_not_found());
        assert!(store.delete("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn boxed_store_delegates() {
        let mut store: Box<dyn KeyValueStore> = Box::new(InMemoryStore::new());
        store.put("a", b"1").unwrap();
        store.put("b", b"2").unwrap();
        let keys: Vec<String> = store.keys().unwrap().into_iter().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
