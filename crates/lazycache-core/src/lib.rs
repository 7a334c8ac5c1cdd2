pub mod error;
pub mod fingerprint;
pub mod ops;
pub mod value;

// Re-export commonly used types
pub use error::CoreError;
pub use fingerprint::Fingerprint;
pub use ops::{BinaryOp, UnaryOp};
pub use value::{Object, Value};
