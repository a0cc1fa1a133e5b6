use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ledger::{BudgetPolicy, BudgetStatus, UsageSummary};
use crate::scoring::GradingResult;

pub const COST_REPORT_SCHEMA_VERSION: &str = "1";

/// Cost report persisted next to the grading result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub total_tokens: i64,
    pub usage: UsageSummary,
    pub budget_limit_usd: Option<f64>,
    pub budget: BudgetStatus,
}

impl CostReportArtifact {
    pub fn new(usage: &UsageSummary, policy: &BudgetPolicy) -> Self {
        Self {
            schema_version: COST_REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            total_tokens: usage.total_tokens(),
            usage: usage.clone(),
            budget_limit_usd: policy.limit_usd,
            budget: BudgetStatus::evaluate(usage.total_cost, policy),
        }
    }
}

/// Write the grading result in pretty JSON format.
pub fn write_grading_result_json(path: &Path, result: &GradingResult) -> Result<()> {
    let content = serde_json::to_string_pretty(result).context("serialize grading result")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Write the cost report in pretty JSON format.
pub fn write_usage_summary_json(path: &Path, usage: &UsageSummary, policy: &BudgetPolicy) -> Result<()> {
    let artifact = CostReportArtifact::new(usage, policy);
    let content = serde_json::to_string_pretty(&artifact).context("serialize cost report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a markdown summary of a grading result for terminal output.
pub fn render_grading_summary_md(result: &GradingResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Grade for {}\n\n", result.submission_id));
    out.push_str(&format!(
        "- final score: {:.2}\n- self-assessment: {}\n- criticism multiplier: {}\n- evaluated: {}\n- failed: {}\n",
        result.final_score,
        result.self_assessment,
        result.criticism_multiplier,
        result.evaluations.len(),
        result.failures.len()
    ));
    if result.insufficient_data {
        out.push_str("- **insufficient data**: no criterion could be evaluated\n");
    }
    out.push('\n');

    if !result.breakdown.is_empty() {
        out.push_str("## Categories\n");
        for (name, category) in &result.breakdown {
            if category.insufficient_data {
                out.push_str(&format!("- {}: n/a ({} failed)\n", name, category.failed));
            } else {
                out.push_str(&format!(
                    "- {}: {:.2} ({} evaluated, {} failed)\n",
                    name, category.weighted_score, category.evaluated, category.failed
                ));
            }
        }
        out.push('\n');
    }

    if !result.failures.is_empty() {
        out.push_str("## Failures\n");
        for failure in &result.failures {
            out.push_str(&format!(
                "- `{}` {}: {}\n",
                failure.criterion_id, failure.kind, failure.message
            ));
        }
        out.push('\n');
    }

    out.push_str("## Comparison\n");
    out.push_str(&result.comparison.message);
    out.push('\n');

    if let Some(usage) = &result.usage {
        out.push_str(&format!(
            "\n## Usage\n- api calls: {}\n- tokens: {}\n- cost: ${:.4}\n",
            usage.total_calls,
            usage.total_tokens(),
            usage.total_cost
        ));
    }
    out
}
