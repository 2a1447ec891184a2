// Boardroom
// Main entry point for the boardroom binary

use boardroom_engine::cli::{Cli, Command, SecretAction};
use boardroom_engine::config::Config;
use boardroom_engine::handlers::{
    handle_history, handle_personas, handle_run, handle_secret_delete, handle_secret_set,
    handle_show, OutputFormat,
};
use boardroom_engine::telemetry::{effective_level, init_telemetry_with_level};
use clap::Parser;
use sdk::errors::{BoardErrorExt, EngineError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_default()?
    };

    // RUST_LOG still wins over both
    init_telemetry_with_level(effective_level(cli.log.as_deref(), &config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::debug!("Boardroom v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    let result = match cli.command {
        Command::Run { memo } => {
            tracing::info!("Running board on memo: {}", memo.display());
            handle_run(&memo, &config, format).await
        }

        Command::History { limit } => handle_history(limit, &config, format).await,

        Command::Show { run_id } => handle_show(&run_id, &config, format).await,

        Command::Personas => handle_personas(&config, format).await,

        Command::Secret { action } => match action {
            SecretAction::Set { name } => handle_secret_set(&name, format).await,
            SecretAction::Delete { name } => handle_secret_delete(&name, format).await,
        },
    };

    if let Err(e) = &result {
        if let Some(engine_error) = e.downcast_ref::<EngineError>() {
            eprintln!("Hint: {}", engine_error.user_hint());
        }
    }

    result
}
