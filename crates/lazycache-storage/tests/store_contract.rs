//! Behaviour every [`KeyValueStore`] backend must share, plus the
//! persistence scenarios specific to the directory stores.

use std::fs;

use lazycache_storage::{
    DirStore, InMemoryStore, KeyValueStore, ShardedDirStore, SqliteStore, StorageError,
};
use proptest::prelude::*;

const KEY_A: &str = "3f2a9c0d11";
const KEY_B: &str = "3f77aa0102";
const KEY_C: &str = "e0e0e0e0e0";

fn exercise_contract(store: &mut dyn KeyValueStore) {
    // ---------------------------------------------------------------
    // Empty store
    // ---------------------------------------------------------------
    assert!(store.is_empty().unwrap());
    assert!(!store.contains(KEY_A).unwrap());
    assert!(matches!(store.get(KEY_A), Err(StorageError::NotFound(_))));

    // ---------------------------------------------------------------
    // Put / get / overwrite
    // ---------------------------------------------------------------
    store.put(KEY_A, b"alpha").unwrap();
    store.put(KEY_B, b"beta").unwrap();
    store.put(KEY_C, b"").unwrap();
    assert!(store.contains(KEY_A).unwrap());
    assert_eq!(store.get(KEY_A).unwrap(), b"alpha");
    assert_eq!(store.get(KEY_C).unwrap(), b"", "empty values are valid entries");

    store.put(KEY_A, b"alpha-2").unwrap();
    assert_eq!(store.get(KEY_A).unwrap(), b"alpha-2");
    assert_eq!(store.len().unwrap(), 3);

    let keys: Vec<String> = store.keys().unwrap().into_iter().collect();
    assert_eq!(keys, vec![KEY_A, KEY_B, KEY_C]);

    // ---------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------
    store.delete(KEY_B).unwrap();
    assert!(!store.contains(KEY_B).unwrap());
    assert!(matches!(store.delete(KEY_B), Err(StorageError::NotFound(_))));
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn memory_store_contract() {
    exercise_contract(&mut InMemoryStore::new());
}

#[test]
fn dir_store_contract() {
    let tmp = tempfile::tempdir().unwrap();
    exercise_contract(&mut DirStore::open(tmp.path()).unwrap());
}

#[test]
fn sharded_store_contract() {
    let tmp = tempfile::tempdir().unwrap();
    exercise_contract(&mut ShardedDirStore::open(tmp.path()).unwrap());
}

#[test]
fn sqlite_store_contract() {
    exercise_contract(&mut SqliteStore::in_memory().unwrap());
}

// ---------------------------------------------------------------------
// Reopen scenarios
// ---------------------------------------------------------------------

#[test]
fn dir_store_entries_survive_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let mut store = DirStore::open(tmp.path()).unwrap();
        store.put(KEY_A, b"persisted").unwrap();
    }
    let mut store = DirStore::open(tmp.path()).unwrap();
    assert!(store.contains(KEY_A).unwrap());
    assert_eq!(store.get(KEY_A).unwrap(), b"persisted");
}

#[test]
fn sharded_store_new_prefix_exists_after_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let key = "9a0b1c2d3e";
    {
        let mut store = ShardedDirStore::open(tmp.path()).unwrap();
        store.put(key, b"x").unwrap();
        assert!(store.contains(key).unwrap(), "visible in the writing instance");
    }
    assert!(tmp.path().join("9a").join("0b1c2d3e").is_file());

    let mut reopened = ShardedDirStore::open(tmp.path()).unwrap();
    assert!(reopened.contains(key).unwrap(), "visible after reopening");
    assert_eq!(reopened.get(key).unwrap(), b"x");
}

#[test]
fn sharded_store_sees_siblings_written_before_first_touch() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("ab")).unwrap();
    fs::write(tmp.path().join("ab").join("cdef"), b"old").unwrap();

    let mut store = ShardedDirStore::open(tmp.path()).unwrap();
    store.put("ab1234", b"new").unwrap();
    assert!(store.contains("abcdef").unwrap());
    assert_eq!(store.get("abcdef").unwrap(), b"old");
}

#[test]
fn only_file_backed_stores_validate_keys() {
    let tmp = tempfile::tempdir().unwrap();
    let mut sharded = ShardedDirStore::open(tmp.path().join("s")).unwrap();
    assert!(matches!(
        sharded.put("ab", b"x"),
        Err(StorageError::InvalidKey { .. })
    ));
    let mut flat = DirStore::open(tmp.path().join("f")).unwrap();
    assert!(flat.put("ab", b"x").is_ok());
    let mut sqlite = SqliteStore::in_memory().unwrap();
    assert!(sqlite.put("any key at all", b"x").is_ok());
}

// ---------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn dir_stores_return_what_was_put(
        key in "[0-9a-f]{3,64}",
        value in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let tmp = tempfile::tempdir().unwrap();
        let mut flat = DirStore::open(tmp.path().join("flat")).unwrap();
        let mut sharded = ShardedDirStore::open(tmp.path().join("sharded")).unwrap();

        flat.put(&key, &value).unwrap();
        sharded.put(&key, &value).unwrap();

        prop_assert_eq!(flat.get(&key).unwrap(), value.clone());
        prop_assert_eq!(sharded.get(&key).unwrap(), value);
    }
}
