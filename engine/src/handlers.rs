//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Run the board on a memo and persist the outcome
//! - history: Show the last N runs
//! - show: Show every recorded outcome of a run
//! - personas: List the configured lineup
//! - secret set/delete: Manage keychain credentials

use anyhow::{Context, Result};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::board::{BoardRunResult, Orchestrator, PersonaRegistry, RunRecords};
use crate::config::Config;
use crate::db::{Database, RunRepository, RunRow, RunStatus};
use crate::llm::openai::OpenAIProvider;
use crate::llm::retry::RetryingClient;
use crate::secrets::SecretManager;
use sdk::Memo;

/// Keychain service name for Boardroom credentials
pub const KEYCHAIN_SERVICE: &str = "boardroom";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// A run that reached `Complete` and was persisted
#[derive(Debug)]
pub struct CompletedRun {
    pub run_id: String,
    pub result: BoardRunResult,
    pub records: RunRecords,
    pub duration_ms: i64,
}

/// Build the orchestrator from configuration
///
/// Fails before any network call if a persona has no instructions or the API
/// credential cannot be resolved.
pub fn build_orchestrator(config: &Config, secrets: &SecretManager) -> Result<Orchestrator> {
    let registry = PersonaRegistry::from_config(
        &config.board,
        config.llm.reasoning_effort,
        config.llm.verbosity,
    )?;

    let api_key = secrets.get_secret(&config.llm.api_key_name)?;
    let provider = OpenAIProvider::new(config.llm.clone(), api_key);
    let client = RetryingClient::new(Arc::new(provider), config.retry.policy(&config.llm));

    Ok(Orchestrator::new(client, Arc::new(registry)))
}

/// Run the board on a memo and persist the outcome
///
/// A completed run writes every phase row in one transaction. A failed run
/// records only the failing phase, persona and message on the run row; a run
/// whose rows cannot be stored is marked failed without a phase.
pub async fn execute_run(
    orchestrator: &Orchestrator,
    runs: &RunRepository,
    memo: &Memo,
    model: &str,
) -> Result<CompletedRun> {
    memo.validate()?;

    let run_id = uuid::Uuid::new_v4().to_string();
    runs.create_run(&run_id, memo, model).await?;
    tracing::info!(run_id = %run_id, decision = %memo.decision_required, "Board run started");

    let started = Instant::now();
    let outcome = orchestrator.run(memo).await;
    let duration_ms = started.elapsed().as_millis() as i64;

    match outcome {
        Ok(result) => {
            let records = RunRecords::from_result(&result, orchestrator.personas());
            if let Err(e) = runs.record_completed(&run_id, &records, duration_ms).await {
                let message = format!("{:#}", e);
                if let Err(mark_err) =
                    runs.mark_persist_failed(&run_id, &message, duration_ms).await
                {
                    tracing::error!(run_id = %run_id, error = %mark_err, "Failed to mark run as failed");
                }
                return Err(e.context(format!("Failed to persist run {}", run_id)));
            }

            Ok(CompletedRun {
                run_id,
                result,
                records,
                duration_ms,
            })
        }
        Err(e) => {
            if let Err(mark_err) = runs
                .mark_failed(&run_id, e.phase, &e.persona_id, &e.cause.to_string(), duration_ms)
                .await
            {
                tracing::error!(run_id = %run_id, error = %mark_err, "Failed to record run failure");
            }
            Err(anyhow::Error::new(e).context(format!("Run {} failed", run_id)))
        }
    }
}

/// Run the board on a memo file
pub async fn handle_run(memo_path: &Path, config: &Config, format: OutputFormat) -> Result<()> {
    let memo = read_memo(memo_path)?;
    memo.validate()?;

    let secrets = SecretManager::new(KEYCHAIN_SERVICE);
    let orchestrator = build_orchestrator(config, &secrets)?;

    let database = Database::new(&get_db_path(config))
        .await
        .context("Failed to open database")?;
    let runs = database.runs();

    if let OutputFormat::Text = format {
        println!("Convening the board: {}", memo.decision_required);
        println!();
    }

    match execute_run(&orchestrator, &runs, &memo, &config.llm.model).await {
        Ok(run) => {
            match format {
                OutputFormat::Text => {
                    print_records(&run.records);
                    println!();
                    println!("✓ Board run complete");
                    println!("  Run ID: {}", run.run_id);
                    println!("  Tokens: {}", run.result.total_tokens);
                    println!("  Duration: {}ms", run.duration_ms);
                }
                OutputFormat::Json => {
                    let output = json!({
                        "status": "complete",
                        "run_id": run.run_id,
                        "total_tokens": run.result.total_tokens,
                        "duration_ms": run.duration_ms,
                        "normalization": run.records.normalization,
                        "reviews": run.records.reviews,
                        "synthesis": run.records.synthesis,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            database.close().await?;
            Ok(())
        }
        Err(e) => {
            match format {
                OutputFormat::Text => {
                    println!("✗ Board run failed: {:#}", e);
                }
                OutputFormat::Json => {
                    let output = json!({
                        "status": "failed",
                        "error": format!("{:#}", e),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            database.close().await?;
            Err(e)
        }
    }
}

/// Show recent runs
pub async fn handle_history(limit: usize, config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::new(&get_db_path(config))
        .await
        .context("Failed to open database")?;

    let runs = database
        .runs()
        .get_recent_runs(limit as i64)
        .await
        .context("Failed to fetch run history")?;

    match format {
        OutputFormat::Text => {
            if runs.is_empty() {
                println!("No board runs in history");
                return Ok(());
            }

            println!("Run History (last {} runs):", limit);
            println!();

            for run in &runs {
                print_run_header(run);
                println!();
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "runs": runs,
                "count": runs.len(),
                "limit": limit
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show a run and its recorded outcomes
pub async fn handle_show(run_id: &str, config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::new(&get_db_path(config))
        .await
        .context("Failed to open database")?;
    let repo = database.runs();

    let run = repo
        .get_run(run_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Run not found: {}", run_id))?;

    let normalization = repo.get_normalization(run_id).await?;
    let reviews = repo.get_reviews(run_id).await?;
    let synthesis = repo.get_synthesis(run_id).await?;

    match format {
        OutputFormat::Text => {
            print_run_header(&run);
            println!();

            if let (Some(normalization), Some(synthesis)) = (normalization, synthesis) {
                print_records(&RunRecords {
                    normalization,
                    reviews,
                    synthesis,
                    total_tokens: run.total_tokens as u64,
                });
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "run": run,
                "normalization": normalization,
                "reviews": reviews,
                "synthesis": synthesis,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// List the configured personas
pub async fn handle_personas(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = PersonaRegistry::from_config(
        &config.board,
        config.llm.reasoning_effort,
        config.llm.verbosity,
    )?;

    match format {
        OutputFormat::Text => {
            println!("Board personas:");
            println!();
            for p in registry.list() {
                let schema = p
                    .output_schema
                    .as_ref()
                    .map(|s| s.name.as_str())
                    .unwrap_or("free text");
                println!(
                    "  {:<12} {:<12} effort: {:<8} verbosity: {:<7} output: {}",
                    p.id,
                    format!("{:?}", p.role).to_lowercase(),
                    p.reasoning_effort,
                    p.verbosity,
                    schema
                );
            }
        }
        OutputFormat::Json => {
            let personas: Vec<_> = registry
                .list()
                .into_iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "role": p.role,
                        "reasoning_effort": p.reasoning_effort,
                        "verbosity": p.verbosity,
                        "output_schema": p.output_schema.as_ref().map(|s| s.name.clone()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "personas": personas }))?);
        }
    }

    Ok(())
}

/// Store a credential in the keychain, prompting for its value
pub async fn handle_secret_set(name: &str, format: OutputFormat) -> Result<()> {
    let secrets = SecretManager::new(KEYCHAIN_SERVICE);
    let value = secrets.prompt_for_secret(name)?;
    secrets.set_secret(name, &value)?;

    match format {
        OutputFormat::Text => println!("✓ Stored '{}' in the keychain", name),
        OutputFormat::Json => {
            println!("{}", json!({ "status": "stored", "name": name }));
        }
    }
    Ok(())
}

/// Remove a credential from the keychain
pub async fn handle_secret_delete(name: &str, format: OutputFormat) -> Result<()> {
    SecretManager::new(KEYCHAIN_SERVICE).delete_secret(name)?;

    match format {
        OutputFormat::Text => println!("✓ Deleted '{}' from the keychain", name),
        OutputFormat::Json => {
            println!("{}", json!({ "status": "deleted", "name": name }));
        }
    }
    Ok(())
}

fn read_memo(path: &Path) -> Result<Memo> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read memo from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read memo {}", path.display()))?
    };

    Ok(Memo::from_json_str(&text)?)
}

fn print_run_header(run: &RunRow) {
    println!("Run ID: {}", run.id);
    println!("  Decision: {}", run.decision);
    println!("  Status: {}", run.status.as_str());
    println!("  Model: {}", run.model);

    if run.status == RunStatus::Complete {
        println!("  Tokens: {}", run.total_tokens);
    }

    if run.status == RunStatus::Failed {
        println!(
            "  Failed in: {} ({})",
            run.failed_phase.as_deref().unwrap_or("unknown"),
            run.failed_persona.as_deref().unwrap_or("unknown")
        );
        if let Some(message) = &run.error_message {
            println!("  Error: {}", message);
        }
    }

    if let Some(duration) = run.duration_ms {
        println!("  Duration: {}ms", duration);
    }

    let created = chrono::DateTime::from_timestamp(run.created_at, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    println!("  Created: {}", created);
}

fn print_records(records: &RunRecords) {
    println!("Brief ({}):", records.normalization.persona_id);
    println!("{}", records.normalization.raw_text.trim());
    println!();

    for review in &records.reviews {
        println!(
            "{}: {} (confidence: {})",
            review.persona_id,
            review.position.as_deref().unwrap_or("N/A"),
            review.confidence.as_deref().unwrap_or("N/A")
        );
        if !review.structured {
            println!("  (no structured answer)");
        }
        for reason in review.reasons.iter().take(3) {
            println!("  + {}", reason);
        }
        for risk in review.risks.iter().take(3) {
            println!("  - {}", risk);
        }
    }
    println!();

    let s = &records.synthesis;
    println!("Recommendation ({}):", s.persona_id);
    if let Some(decision) = &s.decision_statement {
        println!("  Decision: {}", decision);
    }
    match &s.recommendation {
        Some(rec) => println!("  {}", rec),
        None => println!("  {}", s.raw_text.trim()),
    }
    if !s.next_steps.is_empty() {
        println!();
        println!("Next steps:");
        for (i, step) in s.next_steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
    }
}

/// Path of the SQLite database
fn get_db_path(config: &Config) -> PathBuf {
    config.db_path()
}
