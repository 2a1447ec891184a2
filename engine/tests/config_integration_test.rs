//! Integration tests for loading configuration files from disk

use boardroom_engine::config::Config;
use boardroom_engine::llm::ReasoningEffort;
use boardroom_engine::board::PersonaRegistry;
use sdk::errors::EngineError;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_partial_file_keeps_defaults_for_missing_sections() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[llm]
model = "gpt-5-mini"

[retry]
base_delay_ms = 250
"#,
    );

    let config = Config::load_from_path(&path).unwrap();
    let defaults = Config::default();

    assert_eq!(config.llm.model, "gpt-5-mini");
    assert_eq!(config.llm.base_url, defaults.llm.base_url);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.board.reviewers, defaults.board.reviewers);
    assert_eq!(config.core.log_level, "info");

    let policy = config.retry.policy(&config.llm);
    assert_eq!(policy.base_delay, Duration::from_millis(250));
    assert_eq!(policy.call_timeout, Some(Duration::from_secs(180)));
}

#[test]
fn test_custom_lineup_and_prompts_dir() {
    let dir = TempDir::new().unwrap();
    let prompts = dir.path().join("prompts");
    fs::create_dir(&prompts).unwrap();
    fs::write(prompts.join("historian.md"), "You are the Historian.").unwrap();

    let path = write_config(
        &dir,
        &format!(
            r#"
[board]
reviewers = ["skeptic", "historian"]
prompts_dir = "{}"

[board.effort]
historian = "low"
"#,
            prompts.display()
        ),
    );

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.board.reviewers, vec!["skeptic", "historian"]);
    assert_eq!(config.board.effort.get("historian"), Some(&ReasoningEffort::Low));

    let registry =
        PersonaRegistry::from_config(&config.board, config.llm.reasoning_effort, config.llm.verbosity)
            .unwrap();
    assert_eq!(registry.reviewer_ids(), vec!["skeptic", "historian"]);
    assert_eq!(
        registry.describe("historian").unwrap().instructions,
        "You are the Historian."
    );
    assert_eq!(registry.effort_for("historian"), ReasoningEffort::Low);
}

#[test]
fn test_zero_timeout_disables_call_deadline() {
    let config = Config::from_toml_str("[llm]\ntimeout_secs = 0\n").unwrap();
    assert_eq!(config.retry.policy(&config.llm).call_timeout, None);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[llm\nmodel = ");

    match Config::load_from_path(&path) {
        Err(EngineError::Config(message)) => assert!(message.contains("parse")),
        other => panic!("Expected config error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let result = Config::load_from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        "[core]\nlog_level = \"loud\"\n",
        "[retry]\nmax_attempts = 0\n",
        "[board]\nreviewers = []\n",
        "[board]\nreviewers = [\"chair\"]\n",
        "[llm]\nmodel = \"  \"\n",
    ];

    for case in cases {
        assert!(
            matches!(Config::from_toml_str(case), Err(EngineError::Config(_))),
            "accepted: {}",
            case
        );
    }
}

#[test]
fn test_db_path_under_data_dir() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_toml_str(&format!(
        "[core]\ndata_dir = \"{}\"\n",
        dir.path().display()
    ))
    .unwrap();

    assert_eq!(config.db_path(), dir.path().join("boardroom.db"));
}
