//! Lazy evaluation with fingerprint-keyed result caching.
//!
//! A [`Lazy`] factory wraps literals and functions into [`LazyNode`]s.
//! Calling a function node, or applying an operator to any node, builds a
//! new node instead of running anything. Each node carries a fingerprint
//! derived from its structure; [`LazyNode::resolve`] looks that fingerprint
//! up in the factory's store and only computes on a miss.
//!
//! ```
//! use lazycache_eval::{callable, CallArgs, EvalError, Lazy, Operand};
//! use lazycache_storage::InMemoryStore;
//!
//! fn summ(args: &CallArgs) -> Result<Operand, EvalError> {
//!     Ok(Operand::from(args.int(0)? + args.int(1)? + args.int(2)?))
//! }
//!
//! let lazy = Lazy::builder().store(InMemoryStore::new()).build();
//! let summ = lazy.function(callable!(summ));
//! let total = summ.call([lazy.lazy(1), lazy.lazy(2), lazy.lazy(3)]);
//! assert_eq!(total.resolve().unwrap().as_int(), Some(6));
//! ```
//!
//! # Modules
//!
//! - [`factory`]: Lazy factory, builder and presets
//! - [`node`]: LazyNode and the Deferred operation enum
//! - [`resolve`]: the resolution state machine
//! - [`hash`]: fingerprint engine and hash registry
//! - [`callable`]: Callable, CallArgs and the `callable!` macro
//! - [`operand`]: Operand trees passed as node arguments
//! - [`codec`]: store value encoding
//! - [`trace`]: resolution trace entries
//! - [`util`]: collection helpers

pub mod callable;
pub mod codec;
pub mod error;
pub mod factory;
pub mod hash;
pub mod node;
pub mod operand;
pub mod resolve;
mod sugar;
pub mod trace;
pub mod util;

// Re-export key types for ergonomic use.
pub use callable::{CallArgs, Callable};
pub use codec::{Codec, CodecError, JsonCodec};
pub use error::EvalError;
pub use factory::{Evaluated, Lazy, LazyBuilder};
pub use hash::{HashAlgorithm, HashRegistry, NodeHasher};
pub use node::{Deferred, LazyNode, NodeFlags};
pub use operand::{unlazy_if_need, Operand};
pub use trace::{ResolutionKind, TraceEntry};
pub use util::select;

pub use lazycache_core::{BinaryOp, Fingerprint, Object, UnaryOp, Value};
