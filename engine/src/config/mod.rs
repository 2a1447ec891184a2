//! Configuration management
//!
//! This module handles loading and validation of the Boardroom configuration.
//! Configuration is stored in TOML format at ~/.boardroom/config.toml and is
//! read once at startup; nothing mutates it during a run.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Completion endpoint, model and default generation controls
//! - **retry**: Attempt budget and backoff for provider calls
//! - **board**: Persona lineup, prompt overrides, per-persona reasoning effort
//!
//! A missing configuration file is not an error: the hardcoded defaults are
//! used instead. A file that exists but fails to parse or validate is.
//!
//! # Examples
//!
//! ```no_run
//! use boardroom_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default()?;
//!
//! println!("Model: {}", config.llm.model);
//! println!("Reviewers: {:?}", config.board.reviewers);
//! # Ok(())
//! # }
//! ```

use crate::llm::retry::RetryPolicy;
use crate::llm::{ReasoningEffort, Verbosity};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Every section is optional in the TOML file and falls back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Completion endpoint settings
    #[serde(default)]
    pub llm: OpenAIConfig,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Board lineup
    #[serde(default)]
    pub board: BoardConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for the Responses API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Output token ceiling when a call does not set one
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Reasoning effort for personas without an override
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: ReasoningEffort,

    /// Verbosity for personas that do not pin one
    #[serde(default = "default_verbosity")]
    pub verbosity: Verbosity,

    /// Upper bound on a single provider call (seconds, 0 disables)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Credential name; resolved from $<NAME> or the OS keychain
    #[serde(default = "default_api_key_name")]
    pub api_key_name: String,
    // Note: the API key itself is never stored in config
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per provider call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit; the delay after failed attempt k is base * 2^k
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Randomize each backoff by up to 25%
    #[serde(default)]
    pub jitter: bool,
}

/// Board lineup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Persona that normalizes the memo
    #[serde(default = "default_normalizer")]
    pub normalizer: String,

    /// Personas reviewing the memo in parallel
    #[serde(default = "default_reviewers")]
    pub reviewers: Vec<String>,

    /// Persona that synthesizes the reviews
    #[serde(default = "default_synthesizer")]
    pub synthesizer: String,

    /// Directory of `<persona>.md` instruction overrides (supports ~ expansion)
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,

    /// Per-persona reasoning effort overrides
    #[serde(default = "default_effort_overrides")]
    pub effort: BTreeMap<String, ReasoningEffort>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.boardroom")
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-5".to_string()
}

fn default_max_output_tokens() -> u32 {
    8000
}

fn default_reasoning_effort() -> ReasoningEffort {
    ReasoningEffort::Medium
}

fn default_verbosity() -> Verbosity {
    Verbosity::Medium
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_api_key_name() -> String {
    "openai_api_key".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_normalizer() -> String {
    "secretary".to_string()
}

fn default_reviewers() -> Vec<String> {
    ["strategist", "skeptic", "operator", "coach"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_synthesizer() -> String {
    "chair".to_string()
}

fn default_effort_overrides() -> BTreeMap<String, ReasoningEffort> {
    BTreeMap::from([
        ("secretary".to_string(), ReasoningEffort::Low),
        ("skeptic".to_string(), ReasoningEffort::High),
        ("chair".to_string(), ReasoningEffort::High),
    ])
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            max_output_tokens: default_max_output_tokens(),
            reasoning_effort: default_reasoning_effort(),
            verbosity: default_verbosity(),
            timeout_secs: default_timeout_secs(),
            api_key_name: default_api_key_name(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            jitter: false,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            normalizer: default_normalizer(),
            reviewers: default_reviewers(),
            synthesizer: default_synthesizer(),
            prompts_dir: None,
            effort: default_effort_overrides(),
        }
    }
}

impl RetryConfig {
    /// Retry policy for provider calls, bounded by the endpoint timeout
    pub fn policy(&self, llm: &OpenAIConfig) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            jitter: self.jitter,
            call_timeout: (llm.timeout_secs > 0).then(|| Duration::from_secs(llm.timeout_secs)),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.boardroom/config.toml)
    ///
    /// If the file does not exist the hardcoded defaults are returned; no
    /// file is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load_or_default() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            tracing::info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            let mut config = Self::default();
            config.validate_and_process()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.boardroom/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".boardroom").join("config.toml"))
    }

    /// Path of the SQLite database inside the data directory
    pub fn db_path(&self) -> PathBuf {
        self.core.data_dir.join("boardroom.db")
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level and numeric limits
    /// - Checks the board lineup is non-empty and free of duplicates
    /// - Expands ~ in the data and prompt directories
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }

        if self.llm.max_output_tokens == 0 {
            return Err(EngineError::Config(
                "llm.max_output_tokens must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(EngineError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        // Validate lineup
        if self.board.reviewers.is_empty() {
            return Err(EngineError::Config(
                "board.reviewers must list at least one persona".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let lineup = std::iter::once(&self.board.normalizer)
            .chain(self.board.reviewers.iter())
            .chain(std::iter::once(&self.board.synthesizer));
        for id in lineup {
            if id.trim().is_empty() {
                return Err(EngineError::Config(
                    "board persona ids must not be empty".to_string(),
                ));
            }
            if !seen.insert(id.as_str()) {
                return Err(EngineError::Config(format!(
                    "Persona '{}' appears more than once in the board lineup",
                    id
                )));
            }
        }

        // Expand paths
        self.core.data_dir = expand_path(&self.core.data_dir)?;
        if let Some(dir) = &self.board.prompts_dir {
            self.board.prompts_dir = Some(expand_path(dir)?);
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
