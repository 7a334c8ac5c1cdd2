//! The fixed-length digest identifying a lazy node.
//!
//! A [`Fingerprint`] is a plain 32-byte newtype so that nodes, store keys and
//! trace entries all agree on one representation. Stores key entries by the
//! lowercase hex form returned by [`Fingerprint::to_hex`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of every fingerprint in bytes (blake3 and SHA-256 both yield 32).
pub const FINGERPRINT_LEN: usize = 32;

/// Structural identity of a deferred computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex encoding, used as the store key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex string back into a fingerprint.
    pub fn from_hex(s: &str) -> Option<Fingerprint> {
        let mut out = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(s, &mut out).ok()?;
        Some(Fingerprint(out))
    }
}

impl From<[u8; FINGERPRINT_LEN]> for Fingerprint {
    fn from(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Fingerprint(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let fp = Fingerprint(bytes);
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab"));
        assert!(hex.ends_with("01"));
        assert_eq!(Fingerprint::from_hex(&hex), Some(fp));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert_eq!(Fingerprint::from_hex("xyz"), None);
        assert_eq!(Fingerprint::from_hex("abcd"), None);
    }

    #[test]
    fn display_is_lowercase_hex() {
        let fp = Fingerprint([0xAB; FINGERPRINT_LEN]);
        assert_eq!(fp.to_string(), "ab".repeat(32));
    }
}
