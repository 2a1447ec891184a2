//! Result Assembler
//!
//! Shapes a completed run into one row per phase and persona. Structured
//! fields are read from the parsed output when present; a missing or
//! mistyped field becomes `None` or an empty list, never an error.

use super::personas::PersonaRegistry;
use super::types::BoardRunResult;
use crate::llm::CompletionOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalization row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizationRecord {
    pub persona_id: String,
    pub raw_text: String,
    pub response_id: Option<String>,
    pub tokens: u64,
}

/// Reviewer row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewRecord {
    pub persona_id: String,
    pub position: Option<String>,
    pub reasons: Vec<String>,
    pub risks: Vec<String>,
    pub modifications: Vec<String>,
    pub validation_metrics: Vec<String>,
    pub confidence: Option<String>,
    /// Whether the reviewer produced a valid structured answer
    pub structured: bool,
    pub raw_text: String,
    pub response_id: Option<String>,
    pub tokens: u64,
}

/// Synthesis row: the review shape plus the integrated recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesisRecord {
    pub persona_id: String,
    pub decision_statement: Option<String>,
    pub recommendation: Option<String>,
    pub position: Option<String>,
    pub reasons: Vec<String>,
    pub risks: Vec<String>,
    pub modifications: Vec<String>,
    pub validation_metrics: Vec<String>,
    pub confidence: Option<String>,
    pub next_steps: Vec<String>,
    pub reasoning_summary: Option<String>,
    pub structured: bool,
    pub raw_text: String,
    pub response_id: Option<String>,
    pub tokens: u64,
}

/// All rows for one completed run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecords {
    pub normalization: NormalizationRecord,
    /// In configured reviewer order
    pub reviews: Vec<ReviewRecord>,
    pub synthesis: SynthesisRecord,
    pub total_tokens: u64,
}

impl RunRecords {
    pub fn from_result(result: &BoardRunResult, personas: &PersonaRegistry) -> Self {
        let reviews = personas
            .reviewers()
            .iter()
            .filter_map(|p| {
                result
                    .reviews
                    .get(&p.id)
                    .map(|outcome| ReviewRecord::from_outcome(&p.id, outcome))
            })
            .collect();

        Self {
            normalization: NormalizationRecord::from_outcome(
                &personas.normalizer().id,
                &result.normalization,
            ),
            reviews,
            synthesis: SynthesisRecord::from_outcome(&personas.synthesizer().id, &result.synthesis),
            total_tokens: result.total_tokens,
        }
    }
}

impl NormalizationRecord {
    pub fn from_outcome(persona_id: &str, outcome: &CompletionOutcome) -> Self {
        Self {
            persona_id: persona_id.to_string(),
            raw_text: outcome.raw.clone(),
            response_id: outcome.response_id.clone(),
            tokens: outcome.usage.total,
        }
    }
}

impl ReviewRecord {
    pub fn from_outcome(persona_id: &str, outcome: &CompletionOutcome) -> Self {
        let parsed = outcome.parsed.as_ref();
        Self {
            persona_id: persona_id.to_string(),
            position: text(parsed, "position"),
            reasons: list(parsed, "reasons"),
            risks: list(parsed, "risks"),
            modifications: list(parsed, "modifications"),
            validation_metrics: list(parsed, "validation_metrics"),
            confidence: text(parsed, "confidence"),
            structured: parsed.is_some(),
            raw_text: outcome.raw.clone(),
            response_id: outcome.response_id.clone(),
            tokens: outcome.usage.total,
        }
    }
}

impl SynthesisRecord {
    pub fn from_outcome(persona_id: &str, outcome: &CompletionOutcome) -> Self {
        let parsed = outcome.parsed.as_ref();
        Self {
            persona_id: persona_id.to_string(),
            decision_statement: text(parsed, "decision_statement"),
            recommendation: text(parsed, "recommendation"),
            position: text(parsed, "position"),
            reasons: list(parsed, "reasons"),
            risks: list(parsed, "risks"),
            modifications: list(parsed, "modifications"),
            validation_metrics: list(parsed, "validation_metrics"),
            confidence: text(parsed, "confidence"),
            next_steps: list(parsed, "next_steps"),
            reasoning_summary: outcome.reasoning_summary.clone(),
            structured: parsed.is_some(),
            raw_text: outcome.raw.clone(),
            response_id: outcome.response_id.clone(),
            tokens: outcome.usage.total,
        }
    }
}

fn text(parsed: Option<&Value>, field: &str) -> Option<String> {
    parsed?.get(field)?.as_str().map(String::from)
}

fn list(parsed: Option<&Value>, field: &str) -> Vec<String> {
    parsed
        .and_then(|p| p.get(field))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::llm::{ReasoningEffort, TokenUsage, Verbosity};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn outcome(parsed: Option<Value>, total: u64) -> CompletionOutcome {
        CompletionOutcome {
            parsed,
            raw: "raw".into(),
            usage: TokenUsage {
                total,
                ..Default::default()
            },
            response_id: Some("resp".into()),
            reasoning_summary: None,
        }
    }

    #[test]
    fn test_review_record_from_parsed() {
        let record = ReviewRecord::from_outcome(
            "skeptic",
            &outcome(
                Some(json!({
                    "position": "conditional",
                    "reasons": ["a", "b"],
                    "risks": ["c"],
                    "modifications": ["d"],
                    "validation_metrics": ["e"],
                    "confidence": "low"
                })),
                42,
            ),
        );

        assert_eq!(record.position.as_deref(), Some("conditional"));
        assert_eq!(record.reasons, vec!["a", "b"]);
        assert_eq!(record.validation_metrics, vec!["e"]);
        assert_eq!(record.confidence.as_deref(), Some("low"));
        assert!(record.structured);
        assert_eq!(record.tokens, 42);
    }

    #[test]
    fn test_review_record_without_parsed() {
        let record = ReviewRecord::from_outcome("coach", &outcome(None, 5));
        assert_eq!(record.position, None);
        assert!(record.reasons.is_empty());
        assert!(!record.structured);
        assert_eq!(record.raw_text, "raw");
    }

    #[test]
    fn test_run_records_follow_lineup() {
        let registry = PersonaRegistry::from_config(
            &BoardConfig::default(),
            ReasoningEffort::Medium,
            Verbosity::Medium,
        )
        .unwrap();

        let reviews: BTreeMap<String, CompletionOutcome> = registry
            .reviewer_ids()
            .into_iter()
            .map(|id| (id, outcome(None, 1)))
            .collect();
        let result = BoardRunResult {
            normalization: outcome(None, 2),
            reviews,
            synthesis: outcome(
                Some(json!({"decision_statement": "Take it", "next_steps": ["sign"]})),
                3,
            ),
            total_tokens: 9,
        };

        let records = RunRecords::from_result(&result, &registry);
        let order: Vec<&str> = records.reviews.iter().map(|r| r.persona_id.as_str()).collect();
        assert_eq!(order, vec!["strategist", "skeptic", "operator", "coach"]);
        assert_eq!(records.normalization.persona_id, "secretary");
        assert_eq!(records.synthesis.persona_id, "chair");
        assert_eq!(records.synthesis.decision_statement.as_deref(), Some("Take it"));
        assert_eq!(records.synthesis.next_steps, vec!["sign"]);
        assert_eq!(records.total_tokens, 9);
    }
}
