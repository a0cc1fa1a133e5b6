//! Boundary to the external LLM judge.
//!
//! Evaluation tasks only see the [`JudgeClient`] trait; the concrete HTTP
//! client lives in [`anthropic`], and tests use `crate::fakes::ScriptedJudge`.

pub mod anthropic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::TokenUsage;

/// One prompt addressed to the judge on behalf of a criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeRequest {
    pub criterion_id: String,
    pub system: String,
    pub prompt: String,
}

/// Raw judge answer plus the usage it was billed for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// Judge call error taxonomy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Worth retrying: transport failure, rate limit, server error.
    #[error("transient judge error: {0}")]
    Transient(String),

    /// Retrying cannot help: rejected request, bad credentials, unusable reply.
    #[error("permanent judge error: {0}")]
    Permanent(String),
}

impl TaskError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TaskError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            TaskError::Transient(m) | TaskError::Permanent(m) => m,
        }
    }

    /// Classify an HTTP status code. 429 and 5xx are retryable.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("status {}: {}", status, body);
        if status == 429 || (500..600).contains(&status) {
            TaskError::Transient(message)
        } else {
            TaskError::Permanent(message)
        }
    }
}

#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn complete(&self, request: &JudgeRequest) -> Result<Completion, TaskError>;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(TaskError::from_status(429, "slow down").is_transient());
        assert!(TaskError::from_status(500, "").is_transient());
        assert!(TaskError::from_status(529, "overloaded").is_transient());
        assert!(!TaskError::from_status(400, "bad request").is_transient());
        assert!(!TaskError::from_status(401, "unauthorized").is_transient());
        assert_eq!(
            TaskError::from_status(404, "missing").message(),
            "status 404: missing"
        );
    }
}
