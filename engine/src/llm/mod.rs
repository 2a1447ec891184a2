//! LLM Provider Abstraction Layer
//!
//! This module provides the contract for a single completion call against an
//! LLM endpoint. The `CompletionProvider` trait takes instructions, an input
//! (plain text or role-tagged messages) and per-call options, and returns a
//! `CompletionOutcome` carrying the raw text, the parsed structured object when
//! a schema was requested, and token usage.
//!
//! Retrying is layered on top by `retry::RetryingClient`; providers issue
//! exactly one network call per `complete`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod extract;
pub mod openai;
pub mod retry;
pub mod schema;

pub use schema::{FieldKind, OutputSchema, SchemaField};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during a completion call
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// The endpoint answered with a non-success status
    #[error("Provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    /// A success response whose body was not the expected JSON envelope
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Missing credential or otherwise unusable static configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LLMError {
    /// Status code carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            LLMError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt could succeed
    ///
    /// 4xx responses describe a request the provider will keep rejecting,
    /// and configuration errors do not change between attempts.
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::Provider { status, .. } => !(400..500).contains(status),
            LLMError::Configuration(_) => false,
            LLMError::NetworkError(_) | LLMError::Timeout | LLMError::ParseError(_) => true,
        }
    }
}

/// Provider-side deliberation budget, ordered from cheapest to deepest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    None,
    Minimal,
    Low,
    Medium,
    High,
    Xhigh,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::None => "none",
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
            ReasoningEffort::Xhigh => "xhigh",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested answer length
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    Medium,
    High,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Low => "low",
            Verbosity::Medium => "medium",
            Verbosity::High => "high",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message in a role-tagged input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a new developer message
    pub fn developer(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Developer,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Developer,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Developer => write!(f, "developer"),
        }
    }
}

/// Input of a completion call
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionInput {
    /// A single block of text
    Text(String),

    /// Ordered role-tagged messages
    Messages(Vec<Message>),
}

impl CompletionInput {
    pub fn text(content: impl Into<String>) -> Self {
        CompletionInput::Text(content.into())
    }

    /// Total characters across the input, used for logging
    pub fn len(&self) -> usize {
        match self {
            CompletionInput::Text(t) => t.len(),
            CompletionInput::Messages(m) => m.iter().map(|m| m.content.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-call options
///
/// Unset fields fall back to the provider's configured defaults.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Structured output contract, enforced strictly by the provider
    pub output_schema: Option<OutputSchema>,

    pub reasoning_effort: Option<ReasoningEffort>,

    pub verbosity: Option<Verbosity>,

    /// Ask for a human-readable reasoning trace alongside the answer
    pub include_reasoning_summary: bool,

    /// Output token ceiling
    pub max_output_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    pub fn with_reasoning_summary(mut self) -> Self {
        self.include_reasoning_summary = true;
        self
    }
}

/// Token counters reported by the provider; absent counters are zero
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub reasoning: u64,
    pub total: u64,
}

/// Result of one successful completion call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionOutcome {
    /// Structured object; `None` when no schema was requested or the text did
    /// not parse into an object satisfying it
    pub parsed: Option<serde_json::Value>,

    /// Flattened text output
    pub raw: String,

    pub usage: TokenUsage,

    /// Provider-assigned response id
    pub response_id: Option<String>,

    /// Reasoning trace, when one was requested and returned
    pub reasoning_summary: Option<String>,
}

impl CompletionOutcome {
    /// Outcome carrying only free-form text
    pub fn text(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Default::default()
        }
    }
}

/// A completion endpoint
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openai")
    fn name(&self) -> &str;

    /// Issue exactly one completion call
    ///
    /// # Arguments
    /// * `instructions` - Persona instructions
    /// * `input` - Text or role-tagged messages
    /// * `options` - Schema, effort, verbosity and token controls
    ///
    /// # Returns
    /// * `Ok(CompletionOutcome)` - The call succeeded; `parsed` may still be `None`
    /// * `Err(LLMError)` - Transport failure or non-success status
    async fn complete(
        &self,
        instructions: &str,
        input: &CompletionInput,
        options: &CompletionOptions,
    ) -> Result<CompletionOutcome>;
}
