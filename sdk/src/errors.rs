//! Error types and handling
//!
//! This module provides the error types used throughout the Boardroom engine.
//! All errors implement the `BoardErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry credentials. Provider response bodies are
//! scrubbed by the engine before they are wrapped into an `EngineError`.

use thiserror::Error;

/// Trait for Boardroom error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait BoardErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried once the underlying condition clears.
    /// Non-recoverable errors require a change to configuration or input.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing static configuration, unknown
///   personas, missing prompt text or credentials
/// - **Input**: Malformed decision memos
/// - **Database**: SQLite operation failures
/// - **LLM Provider**: Terminal provider failures
/// - **Orchestration**: A board run failed in a specific phase
///
/// # Examples
///
/// ```
/// use sdk::errors::{BoardErrorExt, EngineError};
///
/// let error = EngineError::PersonaNotFound("oracle".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(!error.is_recoverable());
///
/// let transient = EngineError::Database("database is locked".to_string());
/// assert!(transient.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown persona: {0}")]
    PersonaNotFound(String),

    // Input errors
    #[error("Invalid memo: {0}")]
    InvalidMemo(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Orchestration errors
    #[error("Board run failed: {0}")]
    Orchestration(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoardErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file and credentials",
            Self::PersonaNotFound(_) => "Check the persona ids listed under [board]",

            // Input errors
            Self::InvalidMemo(_) => "The memo needs at least a non-empty decision_required",

            // Database errors
            Self::Database(_) => "Database operation failed. Check the data directory",

            // LLM provider errors
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API key and network",

            // Orchestration errors
            Self::Orchestration(_) => "The board could not finish. Try running the memo again",

            // Keyring errors
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            // Generic IO error
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::PersonaNotFound(_) | Self::InvalidMemo(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_not_recoverable() {
        assert!(!EngineError::Config("missing".into()).is_recoverable());
        assert!(!EngineError::PersonaNotFound("x".into()).is_recoverable());
        assert!(!EngineError::InvalidMemo("blank".into()).is_recoverable());
    }

    #[test]
    fn test_runtime_errors_recoverable() {
        assert!(EngineError::Database("locked".into()).is_recoverable());
        assert!(EngineError::Orchestration("parallel_review".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::PersonaNotFound("oracle".to_string());
        assert_eq!(err.to_string(), "Unknown persona: oracle");
    }
}
