//! Byte stores for lazycache fingerprints.
//!
//! Provides the [`KeyValueStore`] trait defining the contract the evaluation
//! engine caches through, plus four backends:
//!
//! - [`InMemoryStore`]: a process-local map, used for memoization and tests.
//! - [`DirStore`]: one file per key inside a single directory.
//! - [`ShardedDirStore`]: one file per key, bucketed into two-character
//!   prefix subdirectories.
//! - [`SqliteStore`]: a single-table SQLite database.
//!
//! # Architecture
//!
//! Stores map a lowercase hex fingerprint to opaque bytes. They never look
//! at the bytes; encoding and decoding belong to the codec layer of the
//! evaluation engine. Directory stores keep an in-memory index of the keys
//! they have seen so `contains` does not touch the filesystem on every call.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`key`]: key validation shared by every file-backed store
//! - [`traits`]: KeyValueStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`dir`]: flat DirStore implementation
//! - [`sharded`]: ShardedDirStore implementation
//! - [`schema`]: SQL schema and migration setup
//! - [`sqlite`]: SqliteStore implementation

pub mod dir;
pub mod error;
mod files;
pub mod key;
pub mod memory;
pub mod schema;
pub mod sharded;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use dir::DirStore;
pub use error::StorageError;
pub use key::validate_key;
pub use memory::InMemoryStore;
pub use sharded::ShardedDirStore;
pub use sqlite::SqliteStore;
pub use traits::KeyValueStore;
