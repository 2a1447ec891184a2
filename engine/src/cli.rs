//! CLI interface for Boardroom
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Boardroom: a personal board of advisors
///
/// Sends a decision memo to a panel of LLM personas that review it in
/// parallel, then merges their views into one recommendation.
#[derive(Parser, Debug)]
#[command(name = "boardroom")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the board on a decision memo
    Run {
        /// Path to the memo JSON file ("-" reads stdin)
        memo: PathBuf,
    },

    /// Show recent board runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show every outcome recorded for a run
    Show {
        /// Run ID
        run_id: String,
    },

    /// List the configured personas
    Personas,

    /// Manage credentials in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

/// Credential management actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a credential (prompts for the value)
    Set {
        /// Credential name, e.g. openai_api_key
        name: String,
    },

    /// Remove a stored credential
    Delete {
        /// Credential name
        name: String,
    },
}
