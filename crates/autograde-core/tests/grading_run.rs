//! End-to-end grading runs against a scripted judge.

use std::sync::Arc;
use std::time::Duration;

use autograde_core::fakes::{verdict_json, ScriptedJudge};
use autograde_core::{
    BudgetStatus, Calibration, CostLedger, CriterionDescriptor, FailureKind, Grader, GradingConfig,
    GradingRequest, ParsedDocument, Section, Severity, TaskError, TokenUsage,
};

fn document() -> Arc<ParsedDocument> {
    Arc::new(ParsedDocument {
        total_pages: 4,
        full_text: "Project report with README and tests.".to_string(),
        sections: vec![
            Section {
                title: "README".to_string(),
                content: "Installation and usage.".to_string(),
                page: 1,
            },
            Section {
                title: "Testing".to_string(),
                content: "Unit tests cover the parser.".to_string(),
                page: 3,
            },
        ],
        code_blocks: vec![],
    })
}

fn request(self_assessment: i32) -> GradingRequest {
    GradingRequest {
        submission_id: "student-17".to_string(),
        document: document(),
        self_assessment,
    }
}

fn config(criteria: Vec<CriterionDescriptor>) -> GradingConfig {
    GradingConfig {
        criteria,
        ..GradingConfig::default()
    }
}

fn two_criteria() -> Vec<CriterionDescriptor> {
    vec![
        CriterionDescriptor::new("a", "Documentation", 0.6)
            .with_category("Documentation")
            .with_keywords(["readme"]),
        CriterionDescriptor::new("b", "Testing", 0.4)
            .with_category("Testing")
            .with_keywords(["test"]),
    ]
}

#[tokio::test]
async fn high_self_assessment_applies_strict_grading() {
    let judge = ScriptedJudge::new()
        .respond("a", verdict_json(80.0, Severity::Important))
        .respond("b", verdict_json(60.0, Severity::Critical));
    let grader = Grader::new(config(two_criteria()), Arc::new(judge)).unwrap();

    let result = grader.grade(request(95)).await;

    assert!((result.final_score - 47.6).abs() < 1e-9);
    assert_eq!(result.criticism_multiplier.value(), 1.5);
    assert_eq!(result.self_assessment, 95);
    assert!(!result.insufficient_data);
    assert!(result.failures.is_empty());
    assert_eq!(result.breakdown["Documentation"].weighted_score, 62.0);
    assert_eq!(result.breakdown["Testing"].weighted_score, 26.0);
    assert_eq!(result.comparison.calibration, Calibration::Overestimated);
    assert!(result
        .comparison
        .message
        .contains("very strict standards due to high self-grade"));
}

#[tokio::test(start_paused = true)]
async fn failed_criterion_weight_is_renormalized_away() {
    let judge = ScriptedJudge::new()
        .respond("a", verdict_json(80.0, Severity::Strength))
        .fail("b", TaskError::Transient("status 529: overloaded".into()));
    let grader = Grader::new(config(two_criteria()), Arc::new(judge)).unwrap();

    let result = grader.grade(request(75)).await;

    assert_eq!(result.final_score, 80.0);
    assert_eq!(result.evaluations.len(), 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, FailureKind::Transient);
    assert_eq!(result.failures[0].attempts, 3);
    assert!(result.breakdown["Testing"].insufficient_data);
    assert!(!result.insufficient_data);
}

#[tokio::test]
async fn all_failures_yield_insufficient_data_not_an_error() {
    let judge = ScriptedJudge::new()
        .fail("a", TaskError::Permanent("status 401: invalid x-api-key".into()))
        .fail("b", TaskError::Permanent("status 401: invalid x-api-key".into()));
    let grader = Grader::new(config(two_criteria()), Arc::new(judge)).unwrap();

    let result = grader.grade(request(70)).await;

    assert_eq!(result.final_score, 0.0);
    assert!(result.insufficient_data);
    assert_eq!(result.failures.len(), 2);
    assert_eq!(result.usage.as_ref().unwrap().total_calls, 0);
}

#[tokio::test]
async fn zero_criteria_yield_insufficient_data() {
    let judge = Arc::new(ScriptedJudge::new());
    let grader = Grader::new(GradingConfig::default(), judge.clone()).unwrap();

    let result = grader.grade(request(50)).await;

    assert_eq!(result.final_score, 0.0);
    assert!(result.insufficient_data);
    assert!(result.evaluations.is_empty());
    assert_eq!(judge.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn batch_deadline_from_config_times_out_stragglers() {
    let judge = ScriptedJudge::new()
        .respond("a", verdict_json(70.0, Severity::Minor))
        .respond_after("b", Duration::from_secs(900), verdict_json(100.0, Severity::Strength));
    let mut cfg = config(two_criteria());
    cfg.batch.timeout_secs = 10;
    let grader = Grader::new(cfg, Arc::new(judge)).unwrap();

    let result = grader.grade(request(72)).await;

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].criterion_id, "b");
    assert_eq!(result.failures[0].kind, FailureKind::Timeout);
    // 70 * 0.95 with a neutral multiplier.
    assert!((result.final_score - 66.5).abs() < 1e-9);
}

#[tokio::test]
async fn out_of_range_self_assessment_is_clamped() {
    let judge = ScriptedJudge::new()
        .respond("a", verdict_json(50.0, Severity::Minor))
        .respond("b", verdict_json(50.0, Severity::Minor));
    let grader = Grader::new(config(two_criteria()), Arc::new(judge)).unwrap();

    let result = grader.grade(request(140)).await;
    assert_eq!(result.self_assessment, 100);
    assert_eq!(result.criticism_multiplier.value(), 1.5);
}

#[tokio::test]
async fn shared_ledger_tracks_cost_and_budget() {
    let usage = TokenUsage {
        input_tokens: 100_000,
        output_tokens: 20_000,
    };
    let judge = ScriptedJudge::new()
        .with_usage(usage)
        .respond("a", verdict_json(85.0, Severity::Minor))
        .respond("b", verdict_json(75.0, Severity::Minor));
    let ledger = Arc::new(CostLedger::new());
    let mut cfg = config(two_criteria());
    cfg.cost.budget_limit_usd = Some(1.0);
    let grader = Grader::new(cfg, Arc::new(judge))
        .unwrap()
        .with_ledger(Arc::clone(&ledger));

    let result = grader.grade(request(85)).await;

    // 100k * $3/M + 20k * $15/M = $0.60 per call.
    let summary = result.usage.unwrap();
    assert_eq!(summary.total_calls, 2);
    assert!((summary.total_cost - 1.2).abs() < 1e-9);
    assert!((summary.per_criterion_cost["a"] - 0.6).abs() < 1e-9);
    assert!((summary.average_cost_per_call - 0.6).abs() < 1e-9);
    assert_eq!(ledger.len(), 2);
    assert!(matches!(
        ledger.budget_status(&grader.config().budget_policy()),
        BudgetStatus::Exceeded { .. }
    ));
}

#[test]
fn invalid_config_aborts_before_any_call() {
    let mut cfg = config(two_criteria());
    cfg.retry.max_attempts = 0;
    assert!(Grader::new(cfg, Arc::new(ScriptedJudge::new())).is_err());
}
