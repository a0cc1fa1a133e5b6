//! Autograde Core Library
//!
//! Evaluation orchestration and adaptive scoring for LLM-graded project
//! submissions: a fingerprint-keyed document cache, retrying per-criterion
//! evaluation tasks, a bounded fan-out coordinator with a batch deadline, the
//! self-assessment-aware scoring engine, and a cost/usage ledger.

pub mod cache;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod fanout;
pub mod grader;
pub mod judge;
pub mod ledger;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod scoring;
pub mod task;
pub mod telemetry;

pub use cache::fs::FsDocumentCache;
pub use cache::{get_or_parse, CacheError, CacheLookup, DocumentCache, Fingerprint};

pub use config::GradingConfig;

pub use domain::{
    CodeBlock, CriterionDescriptor, CriterionEvaluation, CriterionOutcome, CriterionSet,
    EvaluationFailure, FailureKind, GradeError, ParsedDocument, Result, Section, Severity,
    DEFAULT_CATEGORY,
};

pub use fanout::{run_batch, BatchConfig, BatchResult};
pub use grader::{Grader, GradingRequest};
pub use judge::anthropic::{AnthropicClient, JudgeSettings};
pub use judge::{Completion, JudgeClient, JudgeRequest, TaskError};
pub use ledger::{
    BudgetPolicy, BudgetStatus, CostLedger, LedgerError, Pricing, TokenUsage, UsageRecord,
    UsageSummary,
};
pub use scoring::{
    adjust_score, CategoryBreakdown, Calibration, Comparison, CriticismMultiplier, GradingResult,
    RunInfo, ScoredCriterion, ScoringConfig, ScoringEngine, SeverityFactors,
};
pub use task::{EvaluationTask, RetryPolicy};

pub use reporting::{
    render_grading_summary_md, write_grading_result_json, write_usage_summary_json,
    CostReportArtifact,
};

pub use metrics::METRICS;
pub use obs::{
    emit_batch_finished, emit_batch_started, emit_budget_status, emit_grade_computed,
    emit_task_failed, run_span,
};
pub use telemetry::init_tracing;

/// Autograde version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
