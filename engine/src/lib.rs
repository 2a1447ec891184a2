//! Boardroom Engine Library
//!
//! This library provides the core functionality of Boardroom: a board of
//! LLM personas that reviews a decision memo. It is used by both the main
//! binary and integration tests.

/// Board orchestration: personas, prompt rendering, the three-phase run
pub mod board;

/// CLI interface module
pub mod cli;

/// Configuration management module
pub mod config;

/// Database persistence module
pub mod db;

/// Command handlers module
pub mod handlers;

/// LLM provider abstraction layer
pub mod llm;

/// Secret management module
pub mod secrets;

/// Telemetry and Observability
pub mod telemetry;
