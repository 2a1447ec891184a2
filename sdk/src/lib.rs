//! Boardroom SDK
//!
//! Shared library providing the request packet types and the error taxonomy
//! used by the engine and by any front end (HTTP layer, CLI) that submits
//! decision memos.

/// Error types and handling
pub mod errors;

/// Decision memo types
pub mod types;

// Re-export commonly used types
pub use errors::{BoardErrorExt, EngineError};
pub use types::{Constraints, Memo, MemoOption};
