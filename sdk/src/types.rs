//! Decision memo types
//!
//! A `Memo` is the request packet submitted to the board. It is built once by
//! the caller and never mutated while a run is in progress.

use crate::errors::EngineError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Decision memo submitted to the board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Memo {
    /// Free-text situational context, one entry per paragraph
    #[serde(default, deserialize_with = "one_or_many")]
    pub context: Vec<String>,

    /// One-sentence statement of the decision to make
    pub decision_required: String,

    /// Options under consideration
    #[serde(default)]
    pub options: Vec<MemoOption>,

    /// Time, budget, risk tolerance and any other constraints
    #[serde(default)]
    pub constraints: Constraints,

    /// How the outcome of the decision will be judged
    #[serde(default)]
    pub success_metrics: Vec<String>,

    /// Open questions the board should address
    #[serde(default)]
    pub questions: Vec<String>,
}

/// One option under consideration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoOption {
    pub id: String,
    pub description: String,
}

impl MemoOption {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Constraints on the decision
///
/// The well-known keys are typed; anything else lands in `extra`, ordered by
/// key so rendering stays deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tolerance: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Memo {
    /// Create a memo with only a decision statement
    pub fn new(decision_required: impl Into<String>) -> Self {
        Self {
            context: Vec::new(),
            decision_required: decision_required.into(),
            options: Vec::new(),
            constraints: Constraints::default(),
            success_metrics: Vec::new(),
            questions: Vec::new(),
        }
    }

    /// Parse and validate a memo from JSON
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidMemo` if the JSON is malformed or the
    /// decision statement is blank.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let memo: Memo = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidMemo(format!("Failed to parse memo: {}", e)))?;
        memo.validate()?;
        Ok(memo)
    }

    /// Check the memo invariants
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.decision_required.trim().is_empty() {
            return Err(EngineError::InvalidMemo(
                "decision_required must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accept either `"text"` or `["a", "b"]`
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_memo_defaults() {
        let memo = Memo::from_json_str(r#"{"decision_required": "Move to Lisbon?"}"#).unwrap();
        assert_eq!(memo.decision_required, "Move to Lisbon?");
        assert!(memo.context.is_empty());
        assert!(memo.options.is_empty());
        assert_eq!(memo.constraints, Constraints::default());
        assert!(memo.success_metrics.is_empty());
        assert!(memo.questions.is_empty());
    }

    #[test]
    fn test_blank_decision_rejected() {
        let err = Memo::from_json_str(r#"{"decision_required": "   "}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMemo(_)));
    }

    #[test]
    fn test_missing_decision_rejected() {
        let err = Memo::from_json_str(r#"{"context": ["hi"]}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMemo(_)));
    }

    #[test]
    fn test_context_accepts_single_string() {
        let memo = Memo::from_json_str(
            r#"{"decision_required": "x", "context": "I have two offers."}"#,
        )
        .unwrap();
        assert_eq!(memo.context, vec!["I have two offers."]);
    }

    #[test]
    fn test_constraints_extra_keys() {
        let memo = Memo::from_json_str(
            r#"{
                "decision_required": "x",
                "constraints": {"risk_tolerance": "medium", "location": "remote", "family": "two kids"}
            }"#,
        )
        .unwrap();
        assert_eq!(memo.constraints.risk_tolerance.as_deref(), Some("medium"));
        assert_eq!(memo.constraints.time, None);
        let keys: Vec<&str> = memo.constraints.extra.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["family", "location"]);
    }

    #[test]
    fn test_options_parse_in_order() {
        let memo = Memo::from_json_str(
            r#"{
                "decision_required": "Should I take the new job offer?",
                "options": [{"id": "A", "description": "Accept"}, {"id": "B", "description": "Decline"}]
            }"#,
        )
        .unwrap();
        assert_eq!(
            memo.options,
            vec![MemoOption::new("A", "Accept"), MemoOption::new("B", "Decline")]
        );
    }
}
