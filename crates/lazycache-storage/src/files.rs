//! Filesystem helpers shared by the directory stores.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::key::validate_key;

/// Writes `bytes` to `path` through a temporary file in `dir` that is renamed
/// into place, so readers never observe a partially written entry.
pub(crate) fn atomic_write(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StorageError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

/// Lists the names of regular files in `dir` that are valid keys.
///
/// Temporary files left behind by an interrupted write start with `.` and are
/// skipped. A missing directory yields an empty set.
pub(crate) fn list_entries(dir: &Path) -> Result<HashSet<String>, StorageError> {
    list_names(dir, |ty| ty.is_file())
}

/// Lists the names of subdirectories in `dir` that are valid keys.
pub(crate) fn list_dirs(dir: &Path) -> Result<HashSet<String>, StorageError> {
    list_names(dir, |ty| ty.is_dir())
}

fn list_names(
    dir: &Path,
    keep: impl Fn(&fs::FileType) -> bool,
) -> Result<HashSet<String>, StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(err) => return Err(StorageError::io(dir, err)),
    };

    let mut names = HashSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| StorageError::io(entry.path(), e))?;
        if !keep(&file_type) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if validate_key(&name).is_ok() {
            names.insert(name);
        }
    }
    Ok(names)
}

/// Reads a whole entry file. An `ErrorKind::NotFound` is passed through as
/// `Ok(None)` so callers can drop the key from their index.
pub(crate) fn read_entry(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StorageError::io(path, err)),
    }
}

/// Removes an entry file, reporting whether it existed.
pub(crate) fn remove_entry(path: &Path) -> Result<bool, StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(StorageError::io(path, err)),
    }
}
