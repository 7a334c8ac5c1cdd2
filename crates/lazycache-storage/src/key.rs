//! Key validation for file-backed stores.
//!
//! Keys become file names, so only a conservative character set is accepted.
//! Fingerprint hex strings always pass.

use crate::error::StorageError;

/// Longest key accepted; keeps file names under common filesystem limits.
pub const MAX_KEY_LEN: usize = 255;

/// Checks that `key` is non-empty, at most [`MAX_KEY_LEN`] bytes, and made
/// only of ASCII alphanumerics, `-` and `_`.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.len() > MAX_KEY_LEN {
        "key is longer than 255 bytes"
    } else if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        "key may only contain ASCII letters, digits, '-' and '_'"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
