//! Evaluation of one criterion against one document.
//!
//! An [`EvaluationTask`] owns the retry loop around a single judge call. Every
//! way a criterion can go wrong ends in an [`EvaluationFailure`] value; the
//! task never panics or bubbles an error past its caller.

pub mod prompt;
pub mod verdict;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::domain::{CriterionDescriptor, CriterionEvaluation, EvaluationFailure, FailureKind, ParsedDocument};
use crate::judge::{JudgeClient, TaskError};
use crate::ledger::{CostLedger, Pricing, UsageRecord};
use crate::metrics::METRICS;
use crate::scoring::CriticismMultiplier;

/// Exponential backoff between judge attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// One criterion, ready to be judged.
#[derive(Debug, Clone)]
pub struct EvaluationTask {
    pub criterion: Arc<CriterionDescriptor>,
    pub multiplier: CriticismMultiplier,
    pub retry: RetryPolicy,
    pub pricing: Pricing,
}

impl EvaluationTask {
    pub fn new(criterion: Arc<CriterionDescriptor>, multiplier: CriticismMultiplier, retry: RetryPolicy) -> Self {
        Self {
            criterion,
            multiplier,
            retry,
            pricing: Pricing::default(),
        }
    }

    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn criterion_id(&self) -> &str {
        &self.criterion.id
    }

    /// Judge the criterion, retrying transient errors with backoff.
    ///
    /// Appends one usage record per attempt that returned a completion,
    /// including attempts whose text then fails to parse.
    pub async fn run(
        &self,
        document: &ParsedDocument,
        judge: &dyn JudgeClient,
        ledger: &CostLedger,
    ) -> Result<CriterionEvaluation, EvaluationFailure> {
        let id = self.criterion_id();

        if let Err(e) = self.criterion.validate() {
            return Err(EvaluationFailure::new(id, FailureKind::Permanent, e.to_string()));
        }

        let request = prompt::build_request(&self.criterion, document, self.multiplier);
        let max_attempts = self.retry.attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            match judge.complete(&request).await {
                Ok(completion) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    let record = UsageRecord::new(id, attempt, completion.usage, &self.pricing)
                        .with_latency_ms(latency_ms);
                    if let Err(e) = ledger.record(record) {
                        warn!(criterion_id = %id, error = %e, "usage record rejected");
                    }

                    return verdict::parse_verdict(id, &completion.text).map_err(|e| {
                        EvaluationFailure::new(id, FailureKind::MalformedResponse, e.to_string())
                            .with_attempts(attempt)
                    });
                }
                Err(TaskError::Permanent(message)) => {
                    return Err(
                        EvaluationFailure::new(id, FailureKind::Permanent, message).with_attempts(attempt),
                    );
                }
                Err(TaskError::Transient(message)) => {
                    last_error = message;
                    if attempt < max_attempts {
                        let delay = self.retry.delay_for(attempt);
                        debug!(
                            criterion_id = %id,
                            attempt = attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "transient judge error, retrying"
                        );
                        METRICS.inc_retries();
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(EvaluationFailure::new(
            id,
            FailureKind::Transient,
            format!("retries exhausted: {}", last_error),
        )
        .with_attempts(max_attempts))
    }
}
