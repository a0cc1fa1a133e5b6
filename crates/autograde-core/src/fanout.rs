//! Bounded-concurrency fan-out of evaluation tasks with one batch deadline.
//!
//! Every criterion gets its own tokio task in a [`JoinSet`]; a semaphore caps
//! how many of them talk to the judge at once. When the deadline elapses the
//! remaining tasks are aborted and reported as [`FailureKind::Timeout`], so a
//! batch always yields exactly one outcome per criterion, in criterion order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::domain::{
    CriterionEvaluation, CriterionOutcome, CriterionSet, EvaluationFailure, FailureKind, ParsedDocument,
};
use crate::judge::JudgeClient;
use crate::ledger::{CostLedger, Pricing};
use crate::metrics::METRICS;
use crate::obs;
use crate::scoring::CriticismMultiplier;
use crate::task::{EvaluationTask, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    /// Tasks allowed to run at once. 0 behaves as 1.
    pub max_concurrency: usize,
    /// Deadline for the whole batch, measured from dispatch.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub pricing: Pricing,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
            pricing: Pricing::default(),
        }
    }
}

/// Outcomes of one batch in criterion order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub outcomes: Vec<CriterionOutcome>,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn evaluations(&self) -> impl Iterator<Item = &CriterionEvaluation> {
        self.outcomes.iter().filter_map(CriterionOutcome::evaluation)
    }

    pub fn failures(&self) -> impl Iterator<Item = &EvaluationFailure> {
        self.outcomes.iter().filter_map(CriterionOutcome::failure)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Evaluate every criterion against `document` and collect one outcome each.
#[instrument(skip_all, fields(criteria = criteria.len(), multiplier = multiplier.value()))]
pub async fn run_batch(
    document: Arc<ParsedDocument>,
    criteria: &CriterionSet,
    multiplier: CriticismMultiplier,
    config: &BatchConfig,
    judge: Arc<dyn JudgeClient>,
    ledger: Arc<CostLedger>,
) -> BatchResult {
    let started = Instant::now();
    if criteria.is_empty() {
        return BatchResult::default();
    }

    let max_concurrency = config.max_concurrency.max(1);
    obs::emit_batch_started(criteria.len(), max_concurrency, config.timeout.as_millis() as u64);

    let deadline = started + config.timeout;
    let sem = Arc::new(Semaphore::new(max_concurrency));
    let mut set = JoinSet::new();
    let mut index_of = HashMap::with_capacity(criteria.len());

    for (index, criterion) in criteria.iter().enumerate() {
        let task = EvaluationTask::new(Arc::clone(criterion), multiplier, config.retry)
            .with_pricing(config.pricing);
        let sem = Arc::clone(&sem);
        let document = Arc::clone(&document);
        let judge = Arc::clone(&judge);
        let ledger = Arc::clone(&ledger);

        let handle = set.spawn(async move {
            // The semaphore is never closed, so acquire only fails if it is dropped.
            let _permit = sem.acquire_owned().await.ok();
            task.run(&document, judge.as_ref(), &ledger).await
        });
        index_of.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<CriterionOutcome>> = vec![None; criteria.len()];

    loop {
        let joined = match tokio::time::timeout_at(deadline, set.join_next_with_id()).await {
            Ok(Some(joined)) => joined,
            Ok(None) => break,
            Err(_) => {
                warn!(
                    outstanding = set.len(),
                    timeout_ms = config.timeout.as_millis() as u64,
                    "batch deadline elapsed, abandoning outstanding tasks"
                );
                set.abort_all();
                break;
            }
        };

        match joined {
            Ok((id, result)) => {
                if let Some(&index) = index_of.get(&id) {
                    slots[index] = Some(CriterionOutcome::from(result));
                }
            }
            Err(join_error) => {
                if let Some(&index) = index_of.get(&join_error.id()) {
                    let criterion_id = criteria
                        .iter()
                        .nth(index)
                        .map(|c| c.id.clone())
                        .unwrap_or_default();
                    slots[index] = Some(CriterionOutcome::Failed(EvaluationFailure::new(
                        criterion_id,
                        FailureKind::Aborted,
                        format!("evaluation task ended abnormally: {}", join_error),
                    )));
                }
            }
        }
    }

    let timeout_message = format!("batch deadline of {}ms elapsed", config.timeout.as_millis());
    let outcomes: Vec<CriterionOutcome> = slots
        .into_iter()
        .zip(criteria.iter())
        .map(|(slot, criterion)| {
            slot.unwrap_or_else(|| {
                CriterionOutcome::Failed(EvaluationFailure::new(
                    criterion.id.clone(),
                    FailureKind::Timeout,
                    timeout_message.clone(),
                ))
            })
        })
        .collect();

    for outcome in &outcomes {
        match outcome {
            CriterionOutcome::Evaluated(e) => {
                METRICS.inc_tasks_evaluated();
                debug!(criterion_id = %e.criterion_id, score = e.score, severity = %e.severity, "criterion evaluated");
            }
            CriterionOutcome::Failed(f) => {
                if f.kind == FailureKind::Timeout {
                    METRICS.inc_tasks_timed_out();
                } else {
                    METRICS.inc_tasks_failed();
                }
                obs::emit_task_failed(f);
            }
        }
    }

    let result = BatchResult {
        outcomes,
        elapsed: started.elapsed(),
    };
    obs::emit_batch_finished(
        result.outcomes.len(),
        result.succeeded(),
        result.failed(),
        result.elapsed.as_millis() as u64,
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionDescriptor, Severity};
    use crate::fakes::{verdict_json, ScriptedJudge};

    fn criteria(ids: &[&str]) -> CriterionSet {
        CriterionSet::new(
            ids.iter()
                .map(|id| CriterionDescriptor::new(*id, id.to_uppercase(), 0.1))
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_set_returns_immediately() {
        let result = run_batch(
            Arc::new(ParsedDocument::default()),
            &CriterionSet::default(),
            CriticismMultiplier::NEUTRAL,
            &BatchConfig::default(),
            Arc::new(ScriptedJudge::new()),
            Arc::new(CostLedger::new()),
        )
        .await;
        assert!(result.outcomes.is_empty());
        assert_eq!(result.failed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn outcomes_follow_criterion_order_not_completion_order() {
        let judge = ScriptedJudge::new()
            .respond_after("slow", Duration::from_secs(5), verdict_json(10.0, Severity::Minor))
            .respond_after("fast", Duration::from_millis(10), verdict_json(90.0, Severity::Strength));

        let result = run_batch(
            Arc::new(ParsedDocument::default()),
            &criteria(&["slow", "fast"]),
            CriticismMultiplier::NEUTRAL,
            &BatchConfig::default(),
            Arc::new(judge),
            Arc::new(CostLedger::new()),
        )
        .await;

        let ids: Vec<&str> = result.outcomes.iter().map(|o| o.criterion_id()).collect();
        assert_eq!(ids, vec!["slow", "fast"]);
        assert_eq!(result.succeeded(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_concurrency_still_makes_progress() {
        let judge = ScriptedJudge::new()
            .respond("a", verdict_json(50.0, Severity::Minor))
            .respond("b", verdict_json(60.0, Severity::Minor));
        let config = BatchConfig {
            max_concurrency: 0,
            ..BatchConfig::default()
        };

        let result = run_batch(
            Arc::new(ParsedDocument::default()),
            &criteria(&["a", "b"]),
            CriticismMultiplier::NEUTRAL,
            &config,
            Arc::new(judge),
            Arc::new(CostLedger::new()),
        )
        .await;
        assert_eq!(result.succeeded(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_task_is_aborted_and_siblings_survive() {
        let judge = ScriptedJudge::new()
            .panic_on("boom")
            .respond("ok", verdict_json(75.0, Severity::Minor));

        let result = run_batch(
            Arc::new(ParsedDocument::default()),
            &criteria(&["boom", "ok"]),
            CriticismMultiplier::NEUTRAL,
            &BatchConfig::default(),
            Arc::new(judge),
            Arc::new(CostLedger::new()),
        )
        .await;

        assert_eq!(result.outcomes[0].failure().unwrap().kind, FailureKind::Aborted);
        assert!(result.outcomes[1].is_success());
    }

    #[test]
    fn release_profile_unwinds_task_panics() {
        let manifest: toml::Value = toml::from_str(include_str!("../../../Cargo.toml")).unwrap();
        let panic = manifest
            .get("profile")
            .and_then(|p| p.get("release"))
            .and_then(|r| r.get("panic"))
            .and_then(toml::Value::as_str);
        assert_ne!(panic, Some("abort"));
    }
}
