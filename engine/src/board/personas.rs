//! Persona Registry
//!
//! Maps persona ids to their instructions, output contract and generation
//! controls. The registry is built once from configuration at startup and is
//! read-only afterwards.
//!
//! Built-in personas carry instructions compiled into the binary. Any persona
//! can be overridden, and custom reviewers added, by dropping `<id>.md` into
//! the configured prompts directory.

use crate::config::BoardConfig;
use crate::llm::{OutputSchema, ReasoningEffort, SchemaField, Verbosity};
use sdk::errors::EngineError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Allowed reviewer positions
pub const POSITIONS: &[&str] = &["support", "oppose", "conditional"];

/// Allowed confidence levels
pub const CONFIDENCE_LEVELS: &[&str] = &["low", "medium", "high"];

/// What a persona does in a run
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersonaRole {
    Normalizer,
    Reviewer,
    Synthesizer,
}

/// Static description of one persona
#[derive(Debug, Clone)]
pub struct PersonaDescriptor {
    pub id: String,
    pub role: PersonaRole,
    pub instructions: String,
    pub output_schema: Option<OutputSchema>,
    pub reasoning_effort: ReasoningEffort,
    pub verbosity: Verbosity,
}

fn builtin_prompt(id: &str) -> Option<&'static str> {
    match id {
        "secretary" => Some(include_str!("../../prompts/secretary.md")),
        "strategist" => Some(include_str!("../../prompts/strategist.md")),
        "skeptic" => Some(include_str!("../../prompts/skeptic.md")),
        "operator" => Some(include_str!("../../prompts/operator.md")),
        "coach" => Some(include_str!("../../prompts/coach.md")),
        "chair" => Some(include_str!("../../prompts/chair.md")),
        _ => None,
    }
}

/// Output contract every reviewer answers with
pub fn review_schema() -> OutputSchema {
    OutputSchema::new(
        "board_review",
        vec![
            SchemaField::one_of("position", POSITIONS, "Stance on the decision"),
            SchemaField::text_list("reasons", "Strongest reasons for the stance"),
            SchemaField::text_list("risks", "Most important risks"),
            SchemaField::text_list("modifications", "Changes that would improve the decision"),
            SchemaField::text_list(
                "validation_metrics",
                "Signals that would show the decision is working",
            ),
            SchemaField::one_of("confidence", CONFIDENCE_LEVELS, "Confidence in the stance"),
        ],
    )
}

/// Output contract of the synthesis persona
pub fn synthesis_schema() -> OutputSchema {
    OutputSchema::new(
        "board_synthesis",
        vec![
            SchemaField::text("decision_statement", "The decision restated in one sentence"),
            SchemaField::text("recommendation", "The board's integrated recommendation"),
            SchemaField::one_of("position", POSITIONS, "Overall stance of the board"),
            SchemaField::text_list("reasons", "Reasons that survive across reviewers"),
            SchemaField::text_list("risks", "Risks the board agrees on"),
            SchemaField::text_list("modifications", "Agreed modifications"),
            SchemaField::text_list("validation_metrics", "Metrics to validate the decision"),
            SchemaField::one_of("confidence", CONFIDENCE_LEVELS, "Board confidence"),
            SchemaField::text_list("next_steps", "Concrete next steps, in order"),
        ],
    )
}

/// Read-only persona lookup
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    normalizer: PersonaDescriptor,
    reviewers: Vec<PersonaDescriptor>,
    synthesizer: PersonaDescriptor,
    default_effort: ReasoningEffort,
    effort_overrides: BTreeMap<String, ReasoningEffort>,
}

impl PersonaRegistry {
    /// Build the registry for the configured lineup
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if a persona has neither built-in
    /// instructions nor a prompt file, or a prompt file cannot be read.
    pub fn from_config(
        board: &BoardConfig,
        default_effort: ReasoningEffort,
        default_verbosity: Verbosity,
    ) -> Result<Self, EngineError> {
        let prompts_dir = board.prompts_dir.as_deref();
        let effort = |id: &str| board.effort.get(id).copied().unwrap_or(default_effort);

        let normalizer = PersonaDescriptor {
            id: board.normalizer.clone(),
            role: PersonaRole::Normalizer,
            instructions: load_instructions(&board.normalizer, prompts_dir)?,
            output_schema: None,
            reasoning_effort: effort(&board.normalizer),
            verbosity: Verbosity::Low,
        };

        let reviewers = board
            .reviewers
            .iter()
            .map(|id| -> Result<PersonaDescriptor, EngineError> {
                Ok(PersonaDescriptor {
                    id: id.clone(),
                    role: PersonaRole::Reviewer,
                    instructions: load_instructions(id, prompts_dir)?,
                    output_schema: Some(review_schema()),
                    reasoning_effort: effort(id),
                    verbosity: default_verbosity,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let synthesizer = PersonaDescriptor {
            id: board.synthesizer.clone(),
            role: PersonaRole::Synthesizer,
            instructions: load_instructions(&board.synthesizer, prompts_dir)?,
            output_schema: Some(synthesis_schema()),
            reasoning_effort: effort(&board.synthesizer),
            verbosity: default_verbosity,
        };

        info!(
            normalizer = %board.normalizer,
            reviewers = board.reviewers.len(),
            synthesizer = %board.synthesizer,
            "Persona registry initialized"
        );

        Ok(Self {
            normalizer,
            reviewers,
            synthesizer,
            default_effort,
            effort_overrides: board.effort.clone(),
        })
    }

    /// Look up a persona
    pub fn describe(&self, persona_id: &str) -> Result<&PersonaDescriptor, EngineError> {
        self.list()
            .into_iter()
            .find(|p| p.id == persona_id)
            .ok_or_else(|| EngineError::PersonaNotFound(persona_id.to_string()))
    }

    /// Reasoning effort for a persona: its override, else the process default
    pub fn effort_for(&self, persona_id: &str) -> ReasoningEffort {
        self.effort_overrides
            .get(persona_id)
            .copied()
            .unwrap_or(self.default_effort)
    }

    pub fn normalizer(&self) -> &PersonaDescriptor {
        &self.normalizer
    }

    /// Reviewers in configured order
    pub fn reviewers(&self) -> &[PersonaDescriptor] {
        &self.reviewers
    }

    pub fn reviewer_ids(&self) -> Vec<String> {
        self.reviewers.iter().map(|p| p.id.clone()).collect()
    }

    pub fn synthesizer(&self) -> &PersonaDescriptor {
        &self.synthesizer
    }

    /// Every persona in run order
    pub fn list(&self) -> Vec<&PersonaDescriptor> {
        std::iter::once(&self.normalizer)
            .chain(self.reviewers.iter())
            .chain(std::iter::once(&self.synthesizer))
            .collect()
    }
}

/// Prompt file override, falling back to the built-in text
fn load_instructions(id: &str, prompts_dir: Option<&Path>) -> Result<String, EngineError> {
    if let Some(dir) = prompts_dir {
        let path = dir.join(format!("{}.md", id));
        if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                EngineError::Config(format!(
                    "Failed to read prompt file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            if text.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "Prompt file {} is empty",
                    path.display()
                )));
            }
            debug!(persona = id, path = %path.display(), "Loaded prompt override");
            return Ok(text);
        }
    }

    builtin_prompt(id).map(str::to_string).ok_or_else(|| {
        EngineError::Config(format!(
            "No instructions for persona '{}': add {}.md to the prompts directory",
            id, id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(board: &BoardConfig) -> PersonaRegistry {
        PersonaRegistry::from_config(board, ReasoningEffort::Medium, Verbosity::Medium).unwrap()
    }

    #[test]
    fn test_default_lineup() {
        let reg = registry(&BoardConfig::default());

        assert_eq!(reg.normalizer().id, "secretary");
        assert_eq!(reg.normalizer().verbosity, Verbosity::Low);
        assert!(reg.normalizer().output_schema.is_none());

        let ids: Vec<&str> = reg.reviewers().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["strategist", "skeptic", "operator", "coach"]);
        for reviewer in reg.reviewers() {
            assert_eq!(reviewer.output_schema.as_ref().unwrap().name, "board_review");
            assert!(!reviewer.instructions.is_empty());
        }

        assert_eq!(
            reg.synthesizer().output_schema.as_ref().unwrap().name,
            "board_synthesis"
        );
        assert_eq!(reg.list().len(), 6);
    }

    #[test]
    fn test_effort_overrides() {
        let reg = registry(&BoardConfig::default());
        assert_eq!(reg.effort_for("skeptic"), ReasoningEffort::High);
        assert_eq!(reg.effort_for("strategist"), ReasoningEffort::Medium);
        assert_eq!(reg.describe("chair").unwrap().reasoning_effort, ReasoningEffort::High);
    }

    #[test]
    fn test_unknown_persona() {
        let reg = registry(&BoardConfig::default());
        let err = reg.describe("oracle").unwrap_err();
        assert!(matches!(err, EngineError::PersonaNotFound(id) if id == "oracle"));
    }

    #[test]
    fn test_custom_reviewer_requires_prompt() {
        let board = BoardConfig {
            reviewers: vec!["historian".to_string()],
            ..BoardConfig::default()
        };
        let err = PersonaRegistry::from_config(&board, ReasoningEffort::Low, Verbosity::Low)
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("historian")));
    }

    #[test]
    fn test_prompt_dir_override_and_custom_reviewer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("historian.md"), "Look for precedent.").unwrap();
        std::fs::write(dir.path().join("chair.md"), "Custom chair.").unwrap();

        let board = BoardConfig {
            reviewers: vec!["historian".to_string(), "skeptic".to_string()],
            prompts_dir: Some(dir.path().to_path_buf()),
            ..BoardConfig::default()
        };
        let reg = registry(&board);

        assert_eq!(reg.describe("historian").unwrap().instructions, "Look for precedent.");
        assert_eq!(reg.synthesizer().instructions, "Custom chair.");
        // Personas without a file keep the built-in text
        assert!(reg.describe("skeptic").unwrap().instructions.contains("Skeptic"));
    }

    #[test]
    fn test_empty_prompt_file_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secretary.md"), "  \n").unwrap();
        let board = BoardConfig {
            prompts_dir: Some(dir.path().to_path_buf()),
            ..BoardConfig::default()
        };
        assert!(PersonaRegistry::from_config(&board, ReasoningEffort::Low, Verbosity::Low).is_err());
    }

    #[test]
    fn test_review_schema_fields() {
        let schema = review_schema();
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["position", "reasons", "risks", "modifications", "validation_metrics", "confidence"]
        );
        assert!(synthesis_schema().field("next_steps").is_some());
    }
}
