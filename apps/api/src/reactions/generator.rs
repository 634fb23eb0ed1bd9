//! Reaction Generation: turns (speech, voter) pairs into short simulated reactions.
//!
//! Flow per voter: build_reaction_prompt → LLM call (timeout, retry on transient
//! errors) → ReactionResult. Failures are captured per item and never abort a batch.
//!
//! Batches run on a bounded worker pool. Results come back in input order
//! regardless of completion order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::llm_client::{LlmError, TextGenerator};
use crate::reactions::models::{FailureReason, GenerationFailure, ReactionResult};
use crate::reactions::prompts::build_reaction_prompt;
use crate::voters::models::VoterRecord;

/// Tuning knobs for generation. Defaults keep the pool small to respect upstream rate limits.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Maximum in-flight LLM calls per batch.
    pub concurrency: usize,
    /// Deadline for a single attempt.
    pub call_timeout: Duration,
    /// Extra attempts after the first, for transient failures only.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each further retry.
    pub initial_backoff: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            call_timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct ReactionGenerator {
    llm: Arc<dyn TextGenerator>,
    settings: GenerationSettings,
}

impl ReactionGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>, settings: GenerationSettings) -> Self {
        Self { llm, settings }
    }

    /// Generates one reaction. Never returns an error: every failure is a
    /// `GenerationFailed` result carrying its cause. Once `cancel` fires no
    /// retry is issued and the failure of the last attempt is reported.
    pub async fn generate(
        &self,
        speech: &str,
        voter: &VoterRecord,
        cancel: &CancellationToken,
    ) -> ReactionResult {
        if speech.trim().is_empty() {
            return ReactionResult::failed(FailureReason::InvalidInput, "speech text is empty");
        }

        let prompt = build_reaction_prompt(speech, voter);

        match self.call_with_retry(&prompt, cancel).await {
            Ok(text) => {
                debug!("Generated reaction for voter {}", voter.name);
                ReactionResult::reaction(text)
            }
            Err(e) => {
                warn!("Reaction generation failed for voter {}: {}", voter.name, e);
                ReactionResult::GenerationFailed(GenerationFailure::from(e))
            }
        }
    }

    /// Calls the LLM with a per-attempt timeout. Retries timeouts, transport
    /// errors, 429 and 5xx with exponential backoff; anything else fails at once.
    /// No retry is issued after `cancel` fires.
    async fn call_with_retry(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let max_attempts = self.settings.max_retries.saturating_add(1);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if cancelled {
                    info!("Batch cancelled: not retrying after attempt {}", attempt);
                    break;
                }
            }

            let outcome = tokio::time::timeout(
                self.settings.call_timeout,
                self.llm.generate_text(prompt),
            )
            .await
            .unwrap_or(Err(LlmError::Timeout(self.settings.call_timeout)));

            match outcome {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        return Err(LlmError::EmptyContent);
                    }
                    return Ok(text.to_string());
                }
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.settings.max_retries,
        }))
    }

    /// Exponential backoff before retry `retry` (1-based): b, 2b, 4b, ...
    /// Saturates instead of overflowing.
    fn backoff_delay(&self, retry: u32) -> Duration {
        self.settings
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }

    /// Generates reactions for every voter on a bounded worker pool.
    ///
    /// Returns exactly one result per voter, in input order. Once `cancel`
    /// fires no new calls are issued and the remaining voters are marked
    /// `cancelled`; calls already in flight run to completion or timeout.
    pub async fn generate_batch(
        &self,
        speech: &str,
        voters: &[VoterRecord],
        cancel: &CancellationToken,
    ) -> Vec<ReactionResult> {
        info!(
            "Generating reactions for {} voters (concurrency {})",
            voters.len(),
            self.settings.concurrency
        );

        let speech: Arc<str> = Arc::from(speech);
        let permits = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut results: Vec<Option<ReactionResult>> = vec![None; voters.len()];
        let mut task_index: HashMap<task::Id, usize> = HashMap::new();
        let mut join_set = JoinSet::new();

        for (index, voter) in voters.iter().enumerate() {
            // Take the permit before spawning, so a cancelled batch stops issuing calls.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&permits).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                info!(
                    "Batch cancelled: skipping {} remaining voters",
                    voters.len() - index
                );
                break;
            };

            let generator = self.clone();
            let speech = Arc::clone(&speech);
            let voter = voter.clone();
            let cancel = cancel.clone();
            let handle = join_set.spawn(async move {
                let _permit = permit;
                (index, generator.generate(&speech, &voter, &cancel).await)
            });
            task_index.insert(handle.id(), index);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, (index, result))) => results[index] = Some(result),
                Err(e) => {
                    warn!("Reaction task join error: {}", e);
                    if let Some(&index) = task_index.get(&e.id()) {
                        results[index] = Some(ReactionResult::failed(
                            FailureReason::Upstream,
                            "reaction task terminated unexpectedly",
                        ));
                    }
                }
            }
        }

        // Only voters never issued are left empty.
        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    ReactionResult::failed(
                        FailureReason::Cancelled,
                        "batch cancelled before this voter was processed",
                    )
                })
            })
            .collect()
    }
}
