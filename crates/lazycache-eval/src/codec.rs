//! Value encoding for store entries.
//!
//! A [`Codec`] turns a resolved [`Value`] into the bytes a store keeps and
//! back. Payloads carry no version header; a payload that fails to decode is
//! treated as a corrupt entry and recomputed.

use lazycache_core::Value;
use thiserror::Error;

/// Encoding or decoding failure.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode value: {0}")]
    Encode(String),

    #[error("failed to decode value: {0}")]
    Decode(String),
}

/// Converts values to and from store bytes.
pub trait Codec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// JSON encoding through `serde_json`. The default codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazycache_core::Object;

    #[test]
    fn json_roundtrip_keeps_value_shape() {
        let value = Value::map([
            ("t", Value::tuple([Value::Int(1), Value::from("a")])),
            ("o", Value::Object(Object::new("P").with_repr("P()"))),
        ]);
        let bytes = JsonCodec.encode(&value).unwrap();
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = JsonCodec.decode(b"\x00not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
