//! Retry wrapper
//!
//! Bounded exponential backoff around a single provider call. The loop is an
//! explicit state machine:
//!
//! ```text
//! Attempting(k) --ok--> Succeeded
//! Attempting(k) --retryable error, k < max--> BackingOff(k) --> Attempting(k+1)
//! Attempting(k) --4xx / config error / k == max--> Exhausted
//! ```
//!
//! Sleeping goes through the `Sleeper` trait so tests can observe delays
//! without waiting for them.

use super::{CompletionInput, CompletionOptions, CompletionOutcome, CompletionProvider, LLMError};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry budget and timing
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,

    /// Unit of the exponential backoff; the delay after failed attempt k is
    /// `base_delay * 2^k`
    pub base_delay: Duration,

    /// Add up to 25% random delay on top of each backoff
    pub jitter: bool,

    /// Upper bound on a single provider call
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter: false,
            call_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based), before jitter
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempt.min(16));
        self.base_delay.saturating_mul(factor)
    }

    fn delay_for(&self, failed_attempt: u32) -> Duration {
        let delay = self.backoff_for(failed_attempt);
        if !self.jitter {
            return delay;
        }
        let max_extra = delay.as_millis() as u64 / 4;
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        delay + Duration::from_millis(extra)
    }
}

/// Source of backoff delays
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer without blocking other tasks
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

enum RetryState {
    Attempting { attempt: u32 },
    BackingOff { attempt: u32, delay: Duration },
    Succeeded(CompletionOutcome),
    Exhausted(LLMError),
}

/// A completion provider with retries
#[derive(Clone)]
pub struct RetryingClient {
    provider: Arc<dyn CompletionProvider>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(provider, policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        provider: Arc<dyn CompletionProvider>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            provider,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Complete using the policy's attempt budget
    pub async fn complete(
        &self,
        instructions: &str,
        input: &CompletionInput,
        options: &CompletionOptions,
    ) -> super::Result<CompletionOutcome> {
        self.complete_with_retry(instructions, input, options, self.policy.max_attempts)
            .await
    }

    /// Complete, retrying transient failures up to `max_attempts` attempts
    ///
    /// The last error is returned unchanged once the budget is spent or a
    /// non-retryable error occurs.
    pub async fn complete_with_retry(
        &self,
        instructions: &str,
        input: &CompletionInput,
        options: &CompletionOptions,
        max_attempts: u32,
    ) -> super::Result<CompletionOutcome> {
        let max_attempts = max_attempts.max(1);
        let mut state = RetryState::Attempting { attempt: 1 };

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    debug!(
                        provider = self.provider.name(),
                        attempt,
                        max_attempts,
                        input_chars = input.len(),
                        "Issuing completion call"
                    );

                    match self.attempt(instructions, input, options).await {
                        Ok(outcome) => RetryState::Succeeded(outcome),
                        Err(e) => {
                            warn!(
                                provider = self.provider.name(),
                                attempt,
                                max_attempts,
                                error = %e,
                                "Completion attempt failed"
                            );

                            if !e.is_retryable() {
                                info!(attempt, "Error is not retryable, giving up");
                                RetryState::Exhausted(e)
                            } else if attempt >= max_attempts {
                                warn!(max_attempts, "Retry budget exhausted");
                                RetryState::Exhausted(e)
                            } else {
                                RetryState::BackingOff {
                                    attempt,
                                    delay: self.policy.delay_for(attempt),
                                }
                            }
                        }
                    }
                }
                RetryState::BackingOff { attempt, delay } => {
                    info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );
                    self.sleeper.sleep(delay).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RetryState::Succeeded(outcome) => return Ok(outcome),
                RetryState::Exhausted(e) => return Err(e),
            };
        }
    }

    async fn attempt(
        &self,
        instructions: &str,
        input: &CompletionInput,
        options: &CompletionOptions,
    ) -> super::Result<CompletionOutcome> {
        let call = self.provider.complete(instructions, input, options);
        match self.policy.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(LLMError::Timeout)),
            None => call.await,
        }
    }
}
