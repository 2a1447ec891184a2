use crate::llm::{CompletionOutcome, LLMError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Phase of a board run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Normalize,
    ParallelReview,
    Synthesize,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Normalize => "normalize",
            Phase::ParallelReview => "parallel_review",
            Phase::Synthesize => "synthesize",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a run
///
/// ```text
/// Running(Normalize) -> Running(ParallelReview) -> Running(Synthesize) -> Complete
///          \____________________\______________________\-> Failed
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "phase", rename_all = "snake_case")]
pub enum RunState {
    Running(Phase),
    Complete,
    Failed(Phase),
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running(_) => "running",
            RunState::Complete => "complete",
            RunState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed(_))
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardRunResult {
    pub normalization: CompletionOutcome,

    /// Reviewer outcomes keyed by persona id
    pub reviews: BTreeMap<String, CompletionOutcome>,

    pub synthesis: CompletionOutcome,

    /// Sum of `usage.total` over every call in the run
    pub total_tokens: u64,
}

impl BoardRunResult {
    /// Sum the total token counters of every outcome
    pub fn sum_tokens(
        normalization: &CompletionOutcome,
        reviews: &BTreeMap<String, CompletionOutcome>,
        synthesis: &CompletionOutcome,
    ) -> u64 {
        normalization.usage.total
            + reviews.values().map(|r| r.usage.total).sum::<u64>()
            + synthesis.usage.total
    }
}

/// A run failure annotated with where it happened
#[derive(Debug, thiserror::Error)]
#[error("Board run failed in phase '{phase}' (persona '{persona_id}'): {cause}")]
pub struct OrchestrationError {
    pub phase: Phase,
    pub persona_id: String,
    #[source]
    pub cause: LLMError,
}

impl OrchestrationError {
    pub fn new(phase: Phase, persona_id: impl Into<String>, cause: LLMError) -> Self {
        Self {
            phase,
            persona_id: persona_id.into(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TokenUsage;

    fn outcome(total: u64) -> CompletionOutcome {
        CompletionOutcome {
            usage: TokenUsage {
                total,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Normalize.to_string(), "normalize");
        assert_eq!(Phase::ParallelReview.to_string(), "parallel_review");
        assert_eq!(Phase::Synthesize.to_string(), "synthesize");
        assert_eq!(
            serde_json::to_string(&Phase::ParallelReview).unwrap(),
            r#""parallel_review""#
        );
    }

    #[test]
    fn test_run_state_terminal() {
        assert!(!RunState::Running(Phase::Normalize).is_terminal());
        assert!(RunState::Complete.is_terminal());
        assert!(RunState::Failed(Phase::Synthesize).is_terminal());
        assert_eq!(RunState::Failed(Phase::Synthesize).as_str(), "failed");
    }

    #[test]
    fn test_sum_tokens() {
        let reviews = BTreeMap::from([("a".to_string(), outcome(10)), ("b".to_string(), outcome(5))]);
        assert_eq!(BoardRunResult::sum_tokens(&outcome(3), &reviews, &outcome(7)), 25);
    }

    #[test]
    fn test_orchestration_error_message() {
        let err = OrchestrationError::new(
            Phase::ParallelReview,
            "skeptic",
            LLMError::Provider {
                status: 503,
                body: "down".into(),
            },
        );
        let message = err.to_string();
        assert!(message.contains("parallel_review"));
        assert!(message.contains("skeptic"));
        assert!(message.contains("503"));
    }
}
