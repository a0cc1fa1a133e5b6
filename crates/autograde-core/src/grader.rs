//! One grading run end-to-end: multiplier, fan-out, scoring.

use std::sync::Arc;

use tracing::{info, Instrument};

use crate::config::GradingConfig;
use crate::domain::{CriterionSet, ParsedDocument, Result};
use crate::fanout::{run_batch, BatchConfig};
use crate::judge::JudgeClient;
use crate::ledger::{BudgetStatus, CostLedger};
use crate::metrics::METRICS;
use crate::obs;
use crate::scoring::{CriticismMultiplier, GradingResult, RunInfo, ScoringEngine};

/// Input of one grading run.
#[derive(Debug, Clone)]
pub struct GradingRequest {
    pub submission_id: String,
    pub document: Arc<ParsedDocument>,
    /// The student's own grade, nominally 0–100. Out-of-range values are clamped.
    pub self_assessment: i32,
}

/// Grades submissions against a fixed, validated criterion set.
///
/// Each run bills into its own ledger, so a result's usage covers that run
/// only. Records are then copied into the grader's aggregate ledger; share one
/// aggregate across graders with [`Grader::with_ledger`].
pub struct Grader {
    criteria: CriterionSet,
    config: GradingConfig,
    batch: BatchConfig,
    engine: ScoringEngine,
    judge: Arc<dyn JudgeClient>,
    ledger: Arc<CostLedger>,
}

impl Grader {
    /// Validate the configuration and build the criterion set.
    pub fn new(config: GradingConfig, judge: Arc<dyn JudgeClient>) -> Result<Self> {
        config.validate()?;
        let criteria = config.criterion_set()?;
        Ok(Self {
            criteria,
            batch: config.batch_config(),
            engine: ScoringEngine::new(config.scoring.clone()),
            config,
            judge,
            ledger: Arc::new(CostLedger::new()),
        })
    }

    /// Use `ledger` as the aggregate of every run graded by this instance.
    pub fn with_ledger(mut self, ledger: Arc<CostLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn criteria(&self) -> &CriterionSet {
        &self.criteria
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    /// Grade one submission. Partial failure never aborts the run.
    pub async fn grade(&self, request: GradingRequest) -> GradingResult {
        let run = RunInfo::new(request.submission_id.clone(), request.self_assessment);
        let span = obs::run_span(&run.run_id.to_string(), &run.submission_id);
        self.grade_run(run, request.document).instrument(span).await
    }

    async fn grade_run(&self, run: RunInfo, document: Arc<ParsedDocument>) -> GradingResult {
        let multiplier = CriticismMultiplier::from_self_assessment(run.self_assessment);
        info!(
            criteria = self.criteria.len(),
            self_assessment = run.self_assessment,
            criticism_multiplier = multiplier.value(),
            judge_model = %self.judge.model(),
            "grading started"
        );

        let run_ledger = Arc::new(CostLedger::new());
        let batch = run_batch(
            document,
            &self.criteria,
            multiplier,
            &self.batch,
            Arc::clone(&self.judge),
            Arc::clone(&run_ledger),
        )
        .await;

        let usage = run_ledger.summary();
        self.ledger.extend(run_ledger.records());
        let budget = BudgetStatus::evaluate(usage.total_cost, &self.config.budget_policy());
        obs::emit_budget_status(&budget, usage.total_cost);

        let result = self
            .engine
            .score(&run, &self.criteria, &batch.outcomes, Some(usage));

        obs::emit_grade_computed(
            result.final_score,
            result.self_assessment,
            result.criticism_multiplier.value(),
            result.insufficient_data,
        );
        METRICS.flush();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionDescriptor, GradeError, Severity};
    use crate::fakes::{verdict_json, ScriptedJudge};

    fn config(criteria: Vec<CriterionDescriptor>) -> GradingConfig {
        GradingConfig {
            criteria,
            ..GradingConfig::default()
        }
    }

    #[test]
    fn duplicate_criteria_abort_construction() {
        let err = Grader::new(
            config(vec![
                CriterionDescriptor::new("a", "A", 0.5),
                CriterionDescriptor::new("a", "A again", 0.5),
            ]),
            Arc::new(ScriptedJudge::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, GradeError::DuplicateCriterion(_)));
    }

    #[tokio::test]
    async fn grade_attaches_usage() {
        let judge = ScriptedJudge::new().respond("a", verdict_json(90.0, Severity::Strength));
        let grader = Grader::new(
            config(vec![CriterionDescriptor::new("a", "A", 1.0)]),
            Arc::new(judge),
        )
        .unwrap();

        let result = grader
            .grade(GradingRequest {
                submission_id: "sub-1".to_string(),
                document: Arc::new(ParsedDocument::default()),
                self_assessment: 75,
            })
            .await;

        assert_eq!(result.submission_id, "sub-1");
        assert_eq!(result.final_score, 90.0);
        let usage = result.usage.unwrap();
        assert_eq!(usage.total_calls, 1);
        assert_eq!(grader.ledger().len(), 1);
    }

    #[tokio::test]
    async fn each_run_reports_only_its_own_usage() {
        let judge = ScriptedJudge::new().respond("a", verdict_json(90.0, Severity::Strength));
        let grader = Grader::new(
            config(vec![CriterionDescriptor::new("a", "A", 1.0)]),
            Arc::new(judge),
        )
        .unwrap();
        let request = |id: &str| GradingRequest {
            submission_id: id.to_string(),
            document: Arc::new(ParsedDocument::default()),
            self_assessment: 75,
        };

        let first = grader.grade(request("s1")).await.usage.unwrap();
        let second = grader.grade(request("s2")).await.usage.unwrap();

        assert_eq!(first.total_calls, 1);
        assert_eq!(second.total_calls, 1);
        assert!((second.total_cost - first.total_cost).abs() < 1e-12);
        assert_eq!(grader.ledger().len(), 2);
        assert!((grader.ledger().summary().total_cost - 2.0 * first.total_cost).abs() < 1e-12);
    }
}
