//! Core error types for lazycache-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failures an operation on a [`Value`](crate::Value) can hit. These only
//! surface at resolution time: deferred operations are never validated against
//! the runtime type of their operands when they are built.

use thiserror::Error;

/// Core errors produced when applying an operation to concrete values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The operand types do not support the requested operation.
    #[error("unsupported operation: {op} on {operand}")]
    UnsupportedOperation { op: String, operand: String },

    /// Checked integer arithmetic overflowed.
    #[error("integer overflow in {op}")]
    IntegerOverflow { op: String },

    /// Division or modulo by zero.
    #[error("division by zero in {op}")]
    DivideByZero { op: String },

    /// An attribute lookup on an object or map found nothing.
    #[error("'{type_name}' value has no attribute '{name}'")]
    NoSuchAttribute { type_name: String, name: String },

    /// A sequence index fell outside the sequence.
    #[error("index {index} out of range for {type_name} of length {len}")]
    IndexOutOfRange {
        type_name: String,
        index: i64,
        len: usize,
    },

    /// A map lookup by key found nothing.
    #[error("key not found: '{key}'")]
    KeyNotFound { key: String },
}
