//! Per-criterion evaluation outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualitative weight of a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Important,
    Minor,
    Strength,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Minor => "minor",
            Severity::Strength => "strength",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful judgement of one criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionEvaluation {
    pub criterion_id: String,
    /// Raw score in 0.0–100.0.
    pub score: f64,
    pub evidence: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub severity: Severity,
}

/// Why a criterion could not be evaluated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retryable errors persisted through every attempt.
    Transient,
    /// Non-retryable error (bad configuration, rejected request).
    Permanent,
    /// The judge answered, but not with a usable verdict.
    MalformedResponse,
    /// Still outstanding when the batch deadline elapsed.
    Timeout,
    /// The task died without producing an outcome.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Transient => "transient",
            FailureKind::Permanent => "permanent",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::Timeout => "timeout",
            FailureKind::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// A criterion that produced no evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationFailure {
    pub criterion_id: String,
    pub kind: FailureKind,
    pub message: String,
    /// External call attempts made before giving up.
    pub attempts: u32,
}

impl EvaluationFailure {
    pub fn new(criterion_id: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            kind,
            message: message.into(),
            attempts: 0,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

impl fmt::Display for EvaluationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.criterion_id, self.kind, self.message)
    }
}

/// Outcome of one evaluation task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CriterionOutcome {
    Evaluated(CriterionEvaluation),
    Failed(EvaluationFailure),
}

impl CriterionOutcome {
    pub fn criterion_id(&self) -> &str {
        match self {
            CriterionOutcome::Evaluated(e) => &e.criterion_id,
            CriterionOutcome::Failed(f) => &f.criterion_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CriterionOutcome::Evaluated(_))
    }

    pub fn evaluation(&self) -> Option<&CriterionEvaluation> {
        match self {
            CriterionOutcome::Evaluated(e) => Some(e),
            CriterionOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EvaluationFailure> {
        match self {
            CriterionOutcome::Evaluated(_) => None,
            CriterionOutcome::Failed(f) => Some(f),
        }
    }
}

impl From<Result<CriterionEvaluation, EvaluationFailure>> for CriterionOutcome {
    fn from(result: Result<CriterionEvaluation, EvaluationFailure>) -> Self {
        match result {
            Ok(evaluation) => CriterionOutcome::Evaluated(evaluation),
            Err(failure) => CriterionOutcome::Failed(failure),
        }
    }
}
