//! Board orchestrator
//!
//! Drives one run through three phases:
//!
//! 1. **Normalize**: the normalizer persona restates the rendered memo.
//! 2. **Parallel review**: every reviewer reads the rendered memo
//!    concurrently and answers with the review schema.
//! 3. **Synthesize**: the synthesizer reads the memo plus a summary block
//!    per reviewer and answers with the synthesis schema.
//!
//! Any call that fails after its retries ends the run. The error names the
//! phase and persona; there is no partial result.

use super::memo::{build_synthesis_input, render_memo};
use super::personas::{PersonaDescriptor, PersonaRegistry};
use super::types::{BoardRunResult, OrchestrationError, Phase, RunState};
use crate::llm::retry::RetryingClient;
use crate::llm::{CompletionInput, CompletionOptions, CompletionOutcome};
use futures::future::try_join_all;
use sdk::Memo;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs the board workflow for one memo at a time
///
/// The orchestrator holds no per-run state, so one instance can serve
/// concurrent runs.
#[derive(Clone)]
pub struct Orchestrator {
    client: RetryingClient,
    personas: Arc<PersonaRegistry>,
}

impl Orchestrator {
    pub fn new(client: RetryingClient, personas: Arc<PersonaRegistry>) -> Self {
        Self { client, personas }
    }

    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    /// Run all three phases
    ///
    /// # Errors
    ///
    /// Returns `OrchestrationError` naming the phase and persona of the first
    /// call that failed terminally.
    pub async fn run(&self, memo: &Memo) -> Result<BoardRunResult, OrchestrationError> {
        let started = Instant::now();
        let memo_text = render_memo(memo);

        let result = self.run_phases(&memo_text).await;

        match &result {
            Ok(run) => {
                log_transition(RunState::Complete);
                info!(
                    provider = self.client.provider_name(),
                    reviewers = run.reviews.len(),
                    total_tokens = run.total_tokens,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Board run complete"
                );
            }
            Err(e) => {
                log_transition(RunState::Failed(e.phase));
                error!(
                    phase = %e.phase,
                    persona = %e.persona_id,
                    error = %e.cause,
                    "Board run failed"
                );
            }
        }

        result
    }

    async fn run_phases(&self, memo_text: &str) -> Result<BoardRunResult, OrchestrationError> {
        log_transition(RunState::Running(Phase::Normalize));
        let normalizer = self.personas.normalizer();
        let normalization = self
            .call(Phase::Normalize, normalizer, memo_text, options_for(normalizer))
            .await?;

        log_transition(RunState::Running(Phase::ParallelReview));
        let reviews = self.review(memo_text).await?;

        log_transition(RunState::Running(Phase::Synthesize));
        let synthesizer = self.personas.synthesizer();
        let synthesis_input =
            build_synthesis_input(memo_text, &self.personas.reviewer_ids(), &reviews);
        let synthesis = self
            .call(
                Phase::Synthesize,
                synthesizer,
                &synthesis_input,
                options_for(synthesizer).with_reasoning_summary(),
            )
            .await?;

        if synthesis.parsed.is_none() {
            warn!(persona = %synthesizer.id, "Synthesis returned no structured output");
        }

        let total_tokens = BoardRunResult::sum_tokens(&normalization, &reviews, &synthesis);

        Ok(BoardRunResult {
            normalization,
            reviews,
            synthesis,
            total_tokens,
        })
    }

    /// Fan out one call per reviewer and join on all of them
    ///
    /// The first failure resolves the join; the remaining in-flight calls are
    /// dropped.
    async fn review(
        &self,
        memo_text: &str,
    ) -> Result<BTreeMap<String, CompletionOutcome>, OrchestrationError> {
        let calls = self.personas.reviewers().iter().map(|persona| async move {
            let outcome = self
                .call(Phase::ParallelReview, persona, memo_text, options_for(persona))
                .await?;

            if outcome.parsed.is_none() {
                warn!(
                    persona = %persona.id,
                    raw_chars = outcome.raw.len(),
                    "Reviewer returned no structured output"
                );
            }

            Ok::<_, OrchestrationError>((persona.id.clone(), outcome))
        });

        let reviews = try_join_all(calls).await?;
        Ok(reviews.into_iter().collect())
    }

    async fn call(
        &self,
        phase: Phase,
        persona: &PersonaDescriptor,
        input: &str,
        options: CompletionOptions,
    ) -> Result<CompletionOutcome, OrchestrationError> {
        debug!(
            phase = %phase,
            persona = %persona.id,
            effort = %persona.reasoning_effort,
            "Calling persona"
        );

        let outcome = self
            .client
            .complete(
                &persona.instructions,
                &CompletionInput::text(input),
                &options,
            )
            .await
            .map_err(|e| OrchestrationError::new(phase, persona.id.as_str(), e))?;

        debug!(
            phase = %phase,
            persona = %persona.id,
            tokens = outcome.usage.total,
            "Persona answered"
        );

        Ok(outcome)
    }
}

/// Options carrying a persona's schema, effort and verbosity
fn options_for(persona: &PersonaDescriptor) -> CompletionOptions {
    let options = CompletionOptions::default()
        .with_effort(persona.reasoning_effort)
        .with_verbosity(persona.verbosity);

    match &persona.output_schema {
        Some(schema) => options.with_schema(schema.clone()),
        None => options,
    }
}

fn log_transition(state: RunState) {
    match state {
        RunState::Running(phase) => info!(state = state.as_str(), phase = %phase, "Board run phase"),
        _ => debug!(state = state.as_str(), "Board run finished"),
    }
}
