//! Domain models for autograde.
//!
//! Canonical definitions for the core entities:
//! - `ParsedDocument`: Immutable parse result of a submission
//! - `CriterionDescriptor` / `CriterionSet`: Validated rubric dimensions
//! - `CriterionEvaluation` / `EvaluationFailure`: Per-criterion outcomes

pub mod criterion;
pub mod document;
pub mod error;
pub mod evaluation;

pub use criterion::{CriterionDescriptor, CriterionSet, DEFAULT_CATEGORY};
pub use document::{CodeBlock, ParsedDocument, Section};
pub use error::{GradeError, Result};
pub use evaluation::{CriterionEvaluation, CriterionOutcome, EvaluationFailure, FailureKind, Severity};
