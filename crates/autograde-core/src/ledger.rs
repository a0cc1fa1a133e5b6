//! Append-only cost and usage ledger.
//!
//! Evaluation tasks append one [`UsageRecord`] per judge call that returned a
//! completion. The ledger is shared by `Arc` across concurrently running tasks
//! and is passed explicitly; it never influences scores.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Token usage reported by one judge call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl TokenUsage {
    pub fn total(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// Per-token pricing in USD.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: 3.00,
            output_per_million: 15.00,
        }
    }
}

impl Pricing {
    /// Cost of one call, rounded to 4 decimals.
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        let input = usage.input_tokens as f64 / 1_000_000.0 * self.input_per_million;
        let output = usage.output_tokens as f64 / 1_000_000.0 * self.output_per_million;
        ((input + output) * 10_000.0).round() / 10_000.0
    }
}

/// One judge call attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub criterion_id: String,
    /// 1-based attempt number within the task.
    pub attempt: u32,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub latency_ms: u64,
}

impl UsageRecord {
    pub fn new(criterion_id: impl Into<String>, attempt: u32, usage: TokenUsage, pricing: &Pricing) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            attempt,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost_usd: pricing.cost(&usage),
            latency_ms: 0,
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    fn validate(&self) -> Result<(), LedgerError> {
        if self.input_tokens < 0 || self.output_tokens < 0 {
            return Err(LedgerError::InvalidRecord {
                criterion_id: self.criterion_id.clone(),
                reason: "token counts must not be negative".to_string(),
            });
        }
        if !self.cost_usd.is_finite() || self.cost_usd < 0.0 {
            return Err(LedgerError::InvalidRecord {
                criterion_id: self.criterion_id.clone(),
                reason: format!("cost must be a non-negative number, got {}", self.cost_usd),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("invalid usage record for {criterion_id:?}: {reason}")]
    InvalidRecord { criterion_id: String, reason: String },
}

/// Aggregated view of the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageSummary {
    pub total_cost: f64,
    pub per_criterion_cost: BTreeMap<String, f64>,
    pub total_calls: u64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub average_cost_per_call: f64,
    pub total_latency_ms: u64,
}

impl UsageSummary {
    pub fn total_tokens(&self) -> i64 {
        self.total_input_tokens + self.total_output_tokens
    }
}

/// Spending limit used for budget checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BudgetPolicy {
    /// `None` disables budget checks.
    pub limit_usd: Option<f64>,
    /// Fraction of the limit at which a warning is raised.
    pub warn_threshold: f64,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            limit_usd: None,
            warn_threshold: 0.8,
        }
    }
}

/// Spend relative to a [`BudgetPolicy`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    Unlimited,
    WithinBudget { used_fraction: f64 },
    Warning { used_fraction: f64 },
    Exceeded { used_fraction: f64 },
}

impl BudgetStatus {
    pub fn evaluate(total_cost: f64, policy: &BudgetPolicy) -> Self {
        let Some(limit) = policy.limit_usd.filter(|l| *l > 0.0) else {
            return BudgetStatus::Unlimited;
        };
        let used_fraction = total_cost / limit;
        if used_fraction >= 1.0 {
            BudgetStatus::Exceeded { used_fraction }
        } else if used_fraction >= policy.warn_threshold {
            BudgetStatus::Warning { used_fraction }
        } else {
            BudgetStatus::WithinBudget { used_fraction }
        }
    }

    pub fn is_within_budget(&self) -> bool {
        !matches!(self, BudgetStatus::Exceeded { .. })
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetStatus::Unlimited => f.write_str("unlimited"),
            BudgetStatus::WithinBudget { used_fraction } => {
                write!(f, "within budget ({:.1}% used)", used_fraction * 100.0)
            }
            BudgetStatus::Warning { used_fraction } => {
                write!(f, "budget warning ({:.1}% used)", used_fraction * 100.0)
            }
            BudgetStatus::Exceeded { used_fraction } => {
                write!(f, "budget exceeded ({:.1}% used)", used_fraction * 100.0)
            }
        }
    }
}

/// Thread-safe, append-only usage ledger for one grading run.
#[derive(Debug, Default)]
pub struct CostLedger {
    records: Mutex<Vec<UsageRecord>>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Invalid records are rejected and leave the ledger untouched.
    pub fn record(&self, record: UsageRecord) -> Result<(), LedgerError> {
        record.validate()?;
        debug!(
            criterion_id = %record.criterion_id,
            attempt = record.attempt,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            cost_usd = record.cost_usd,
            "usage recorded"
        );
        self.lock().push(record);
        Ok(())
    }

    /// Append records that were already validated by another ledger.
    pub fn extend(&self, records: impl IntoIterator<Item = UsageRecord>) {
        self.lock().extend(records);
    }

    /// Snapshot of every record appended so far, in append order.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Aggregate all records appended so far.
    pub fn summary(&self) -> UsageSummary {
        let records = self.lock();
        let mut summary = UsageSummary::default();
        for record in records.iter() {
            summary.total_cost += record.cost_usd;
            summary.total_calls += 1;
            summary.total_input_tokens += record.input_tokens;
            summary.total_output_tokens += record.output_tokens;
            summary.total_latency_ms += record.latency_ms;
            *summary
                .per_criterion_cost
                .entry(record.criterion_id.clone())
                .or_insert(0.0) += record.cost_usd;
        }
        if summary.total_calls > 0 {
            summary.average_cost_per_call = summary.total_cost / summary.total_calls as f64;
        }
        summary
    }

    pub fn budget_status(&self, policy: &BudgetPolicy) -> BudgetStatus {
        BudgetStatus::evaluate(self.summary().total_cost, policy)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UsageRecord>> {
        // A panic while holding the lock cannot leave a half-written Vec push behind.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
