//! Structured observability hooks for the grading run lifecycle.
//!
//! This module provides:
//! - A run-scoped tracing span via [`run_span`]
//! - Emission functions for key lifecycle events: batch start/finish,
//!   task failure, final grade, budget status
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`); failures and
//! budget warnings at `warn!`.

use tracing::{info, warn};

use crate::domain::EvaluationFailure;
use crate::ledger::BudgetStatus;

/// Span carrying `run_id` and `submission_id` for every event of one run.
///
/// Attach it to the run's future with `tracing::Instrument`:
///
/// ```ignore
/// grade_inner().instrument(run_span(&run_id, "submission-42")).await
/// ```
pub fn run_span(run_id: &str, submission_id: &str) -> tracing::Span {
    tracing::info_span!("autograde.run", run_id = %run_id, submission_id = %submission_id)
}

/// Emit event: batch dispatched.
pub fn emit_batch_started(criteria: usize, max_concurrency: usize, timeout_ms: u64) {
    info!(
        event = "batch.started",
        criteria = criteria,
        max_concurrency = max_concurrency,
        timeout_ms = timeout_ms,
    );
}

/// Emit event: one criterion ended without an evaluation.
pub fn emit_task_failed(failure: &EvaluationFailure) {
    warn!(
        event = "task.failed",
        criterion_id = %failure.criterion_id,
        kind = %failure.kind,
        attempts = failure.attempts,
        message = %failure.message,
    );
}

/// Emit event: batch finished (all resolved or deadline hit).
pub fn emit_batch_finished(total: usize, succeeded: usize, failed: usize, elapsed_ms: u64) {
    info!(
        event = "batch.finished",
        total = total,
        succeeded = succeeded,
        failed = failed,
        elapsed_ms = elapsed_ms,
    );
}

/// Emit event: final grade computed.
pub fn emit_grade_computed(final_score: f64, self_assessment: u8, multiplier: f64, insufficient_data: bool) {
    info!(
        event = "grade.computed",
        final_score = final_score,
        self_assessment = self_assessment,
        criticism_multiplier = multiplier,
        insufficient_data = insufficient_data,
    );
}

/// Emit event: spend compared to the configured budget.
pub fn emit_budget_status(status: &BudgetStatus, total_cost: f64) {
    match status {
        BudgetStatus::Unlimited | BudgetStatus::WithinBudget { .. } => {
            info!(event = "budget.status", status = %status, total_cost = total_cost);
        }
        BudgetStatus::Warning { .. } | BudgetStatus::Exceeded { .. } => {
            warn!(event = "budget.status", status = %status, total_cost = total_cost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("test-run-id", "submission");
        let _entered = span.enter();
        emit_batch_started(3, 2, 1_000);
    }
}
