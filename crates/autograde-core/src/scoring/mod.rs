//! Adaptive scoring: per-criterion adjustment and weighted aggregation.
//!
//! [`ScoringEngine::score`] is the only constructor of [`GradingResult`]. It
//! consumes the outcomes of a batch in descriptor order, adjusts every
//! successful score for severity and the run's [`CriticismMultiplier`], and
//! renormalizes weights over the criteria that actually produced a score.
//! Failed criteria are listed in the result but excluded from both sums.

pub mod multiplier;
pub mod narrative;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{CriterionEvaluation, CriterionOutcome, CriterionSet, EvaluationFailure};
use crate::ledger::UsageSummary;

pub use multiplier::{adjust_score, adjust_score_with, clamp_self_assessment, CriticismMultiplier, SeverityFactors};
pub use narrative::{compare, Calibration, Comparison};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub severity_factors: SeverityFactors,
}

/// A successful evaluation with its weight and adjusted score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCriterion {
    pub criterion_id: String,
    pub name: String,
    pub category: String,
    pub weight: f64,
    pub raw_score: f64,
    pub adjusted_score: f64,
    pub evaluation: CriterionEvaluation,
}

/// Weighted score of one category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryBreakdown {
    /// Sum of weights of the category's evaluated criteria.
    pub total_weight: f64,
    pub weighted_score: f64,
    pub evaluated: usize,
    pub failed: usize,
    pub insufficient_data: bool,
}

/// Identity of one grading run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub submission_id: String,
    pub run_id: Uuid,
    /// Raw self-assessment as supplied; clamped to 0–100 when scored.
    pub self_assessment: i32,
}

impl RunInfo {
    pub fn new(submission_id: impl Into<String>, self_assessment: i32) -> Self {
        Self {
            submission_id: submission_id.into(),
            run_id: Uuid::new_v4(),
            self_assessment,
        }
    }
}

/// Final outcome of a grading run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradingResult {
    pub submission_id: String,
    pub run_id: Uuid,
    pub self_assessment: u8,
    /// Weighted mean of adjusted scores, rounded to 2 decimals.
    pub final_score: f64,
    pub criticism_multiplier: CriticismMultiplier,
    pub evaluations: Vec<ScoredCriterion>,
    pub failures: Vec<EvaluationFailure>,
    pub breakdown: BTreeMap<String, CategoryBreakdown>,
    pub comparison: Comparison,
    /// True when no criterion produced a score.
    pub insufficient_data: bool,
    pub usage: Option<UsageSummary>,
    pub graded_at: DateTime<Utc>,
}

impl GradingResult {
    pub fn total_criteria(&self) -> usize {
        self.evaluations.len() + self.failures.len()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct Accumulator {
    weighted_sum: f64,
    total_weight: f64,
    evaluated: usize,
    failed: usize,
}

impl Accumulator {
    fn add(&mut self, adjusted: f64, weight: f64) {
        self.weighted_sum += adjusted * weight;
        self.total_weight += weight;
        self.evaluated += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.total_weight > 0.0).then(|| self.weighted_sum / self.total_weight)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn adjust(&self, evaluation: &CriterionEvaluation, multiplier: CriticismMultiplier) -> f64 {
        adjust_score_with(
            &self.config.severity_factors,
            evaluation.score,
            evaluation.severity,
            multiplier,
        )
    }

    /// Aggregate batch outcomes into the final result.
    ///
    /// Never fails: if nothing was evaluated the result carries
    /// `final_score = 0` and `insufficient_data = true`.
    pub fn score(
        &self,
        run: &RunInfo,
        criteria: &CriterionSet,
        outcomes: &[CriterionOutcome],
        usage: Option<UsageSummary>,
    ) -> GradingResult {
        let self_assessment = clamp_self_assessment(run.self_assessment);
        let multiplier = CriticismMultiplier::from_self_assessment(run.self_assessment);

        let mut overall = Accumulator::default();
        let mut categories: BTreeMap<String, Accumulator> = BTreeMap::new();
        let mut evaluations = Vec::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            let Some(criterion) = criteria.get(outcome.criterion_id()) else {
                warn!(criterion_id = %outcome.criterion_id(), "outcome for unknown criterion ignored");
                continue;
            };
            let category = categories.entry(criterion.category.clone()).or_default();

            match outcome {
                CriterionOutcome::Evaluated(evaluation) => {
                    let adjusted = self.adjust(evaluation, multiplier);
                    overall.add(adjusted, criterion.weight);
                    category.add(adjusted, criterion.weight);
                    evaluations.push(ScoredCriterion {
                        criterion_id: criterion.id.clone(),
                        name: criterion.name.clone(),
                        category: criterion.category.clone(),
                        weight: criterion.weight,
                        raw_score: evaluation.score,
                        adjusted_score: round2(adjusted),
                        evaluation: evaluation.clone(),
                    });
                }
                CriterionOutcome::Failed(failure) => {
                    overall.failed += 1;
                    category.failed += 1;
                    failures.push(failure.clone());
                }
            }
        }

        let insufficient_data = overall.mean().is_none();
        let final_score = round2(overall.mean().unwrap_or(0.0));

        let breakdown = categories
            .into_iter()
            .map(|(name, acc)| {
                let breakdown = CategoryBreakdown {
                    total_weight: acc.total_weight,
                    weighted_score: round2(acc.mean().unwrap_or(0.0)),
                    evaluated: acc.evaluated,
                    failed: acc.failed,
                    insufficient_data: acc.mean().is_none(),
                };
                (name, breakdown)
            })
            .collect();

        let comparison = compare(final_score, self_assessment, multiplier, insufficient_data);

        GradingResult {
            submission_id: run.submission_id.clone(),
            run_id: run.run_id,
            self_assessment,
            final_score,
            criticism_multiplier: multiplier,
            evaluations,
            failures,
            breakdown,
            comparison,
            insufficient_data,
            usage,
            graded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionDescriptor, FailureKind, Severity};

    fn evaluated(id: &str, score: f64, severity: Severity) -> CriterionOutcome {
        CriterionOutcome::Evaluated(CriterionEvaluation {
            criterion_id: id.to_string(),
            score,
            evidence: vec![],
            strengths: vec![],
            weaknesses: vec![],
            suggestions: vec![],
            severity,
        })
    }

    fn failed(id: &str) -> CriterionOutcome {
        CriterionOutcome::Failed(EvaluationFailure::new(id, FailureKind::Transient, "down"))
    }

    fn two_criteria() -> CriterionSet {
        CriterionSet::new(vec![
            CriterionDescriptor::new("a", "A", 0.6).with_category("Docs"),
            CriterionDescriptor::new("b", "B", 0.4).with_category("Code"),
        ])
        .unwrap()
    }

    #[test]
    fn strict_run_matches_hand_computation() {
        let result = ScoringEngine::default().score(
            &RunInfo::new("s1", 95),
            &two_criteria(),
            &[
                evaluated("a", 80.0, Severity::Important),
                evaluated("b", 60.0, Severity::Critical),
            ],
            None,
        );

        assert!((result.final_score - 47.6).abs() < 1e-9);
        assert_eq!(result.criticism_multiplier.value(), 1.5);
        assert!(!result.insufficient_data);
        assert_eq!(result.evaluations[0].adjusted_score, 62.0);
        assert_eq!(result.evaluations[1].adjusted_score, 26.0);
        assert_eq!(result.comparison.calibration, Calibration::Overestimated);
    }

    #[test]
    fn failed_criteria_are_excluded_from_both_sums() {
        let result = ScoringEngine::default().score(
            &RunInfo::new("s1", 75),
            &two_criteria(),
            &[evaluated("a", 80.0, Severity::Strength), failed("b")],
            None,
        );

        // Only "a" counts, so its weight renormalizes to 1.
        assert_eq!(result.final_score, 80.0);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.total_criteria(), 2);
        let code = &result.breakdown["Code"];
        assert!(code.insufficient_data);
        assert_eq!(code.failed, 1);
        assert_eq!(code.weighted_score, 0.0);
        let docs = &result.breakdown["Docs"];
        assert_eq!(docs.evaluated, 1);
        assert!(!docs.insufficient_data);
    }

    #[test]
    fn all_failed_is_insufficient_data() {
        let result = ScoringEngine::default().score(
            &RunInfo::new("s1", 80),
            &two_criteria(),
            &[failed("a"), failed("b")],
            None,
        );
        assert_eq!(result.final_score, 0.0);
        assert!(result.insufficient_data);
        assert!(result.evaluations.is_empty());
        assert!(result.comparison.message.starts_with("No criterion could be evaluated"));
    }

    #[test]
    fn empty_criteria_is_insufficient_data() {
        let result = ScoringEngine::default().score(
            &RunInfo::new("s1", 50),
            &CriterionSet::default(),
            &[],
            None,
        );
        assert_eq!(result.final_score, 0.0);
        assert!(result.insufficient_data);
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn category_scores_use_adjusted_values() {
        let criteria = CriterionSet::new(vec![
            CriterionDescriptor::new("a", "A", 0.5).with_category("Docs"),
            CriterionDescriptor::new("b", "B", 0.5).with_category("Docs"),
        ])
        .unwrap();
        let result = ScoringEngine::default().score(
            &RunInfo::new("s1", 75),
            &criteria,
            &[
                evaluated("a", 100.0, Severity::Strength),
                evaluated("b", 80.0, Severity::Critical),
            ],
            None,
        );
        // (100 + 40) / 2
        assert_eq!(result.breakdown["Docs"].weighted_score, 70.0);
        assert!((result.breakdown["Docs"].total_weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn custom_severity_factors_apply() {
        let engine = ScoringEngine::new(ScoringConfig {
            severity_factors: SeverityFactors {
                critical: 0.2,
                ..SeverityFactors::default()
            },
        });
        let criteria = CriterionSet::new(vec![CriterionDescriptor::new("a", "A", 1.0)]).unwrap();
        let result = engine.score(
            &RunInfo::new("s1", 75),
            &criteria,
            &[evaluated("a", 50.0, Severity::Critical)],
            None,
        );
        assert_eq!(result.final_score, 10.0);
    }

    #[test]
    fn unknown_outcomes_are_ignored() {
        let result = ScoringEngine::default().score(
            &RunInfo::new("s1", 75),
            &two_criteria(),
            &[evaluated("zzz", 10.0, Severity::Strength), evaluated("a", 90.0, Severity::Strength)],
            None,
        );
        assert_eq!(result.evaluations.len(), 1);
        assert_eq!(result.final_score, 90.0);
    }
}
