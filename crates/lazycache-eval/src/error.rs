//! Evaluation error types for lazycache-eval.
//!
//! [`EvalError`] is what [`LazyNode::resolve`](crate::LazyNode::resolve) and
//! [`Lazy::invoke`](crate::Lazy::invoke) return. Operation failures against
//! concrete values come from `lazycache-core`, store failures from
//! `lazycache-storage`; both are wrapped unchanged.

use lazycache_core::CoreError;
use lazycache_storage::StorageError;
use thiserror::Error;

use crate::codec::CodecError;

/// Errors produced while building or resolving lazy nodes.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A deferred operation is not supported by the runtime values.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backing store failed.
    #[error("store error: {0}")]
    Storage(#[from] StorageError),

    /// A value could not be encoded for the store.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Strict mode: a fingerprint fell back to the generic textual
    /// representation of an object.
    #[error("unstable fingerprint: '{class}' has no hash routine and no stable representation")]
    UnstableFingerprint { class: String },

    /// The call target resolved to something other than a function.
    #[error("'{type_name}' value is not callable")]
    NotCallable { type_name: String },

    /// A function endpoint was resolved directly instead of being called.
    #[error("function endpoint has no value")]
    NoValue,

    /// A callable rejected its arguments.
    #[error("bad arguments to {function}: {reason}")]
    Argument { function: String, reason: String },

    /// A callable reported a failure of its own.
    #[error("{function} failed: {message}")]
    Callable { function: String, message: String },
}
