//! TOML configuration for a grading run.
//!
//! Every section is optional and falls back to its defaults, so a file that
//! only lists `[[criteria]]` is a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{CriterionDescriptor, CriterionSet, GradeError, Result};
use crate::fanout::BatchConfig;
use crate::judge::anthropic::JudgeSettings;
use crate::ledger::{BudgetPolicy, Pricing};
use crate::scoring::ScoringConfig;
use crate::task::RetryPolicy;

pub const DEFAULT_CACHE_DIR: &str = ".autograde/cache";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchSection {
    pub max_concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CostSection {
    pub budget_limit_usd: Option<f64>,
    pub warn_threshold: f64,
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for CostSection {
    fn default() -> Self {
        let pricing = Pricing::default();
        Self {
            budget_limit_usd: None,
            warn_threshold: 0.8,
            input_per_million: pricing.input_per_million,
            output_per_million: pricing.output_per_million,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GradingConfig {
    pub cache_dir: PathBuf,
    pub batch: BatchSection,
    pub retry: RetrySection,
    pub scoring: ScoringConfig,
    pub cost: CostSection,
    pub judge: JudgeSettings,
    pub criteria: Vec<CriterionDescriptor>,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            batch: BatchSection::default(),
            retry: RetrySection::default(),
            scoring: ScoringConfig::default(),
            cost: CostSection::default(),
            judge: JudgeSettings::default(),
            criteria: Vec::new(),
        }
    }
}

fn invalid(message: impl Into<String>) -> GradeError {
    GradeError::InvalidConfig(message.into())
}

impl GradingConfig {
    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: GradingConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.timeout_secs == 0 {
            return Err(invalid("batch.timeout_secs must be greater than 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(invalid("retry.base_delay_ms must not exceed retry.max_delay_ms"));
        }
        if !self.scoring.severity_factors.is_valid() {
            return Err(invalid("scoring.severity_factors must be numbers in [0, 1]"));
        }
        if !(self.cost.warn_threshold > 0.0 && self.cost.warn_threshold <= 1.0) {
            return Err(invalid(format!(
                "cost.warn_threshold must be in (0, 1], got {}",
                self.cost.warn_threshold
            )));
        }
        if let Some(limit) = self.cost.budget_limit_usd {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(invalid(format!("cost.budget_limit_usd must be positive, got {}", limit)));
            }
        }
        for (name, price) in [
            ("cost.input_per_million", self.cost.input_per_million),
            ("cost.output_per_million", self.cost.output_per_million),
        ] {
            if !(price.is_finite() && price >= 0.0) {
                return Err(invalid(format!("{} must be a non-negative number, got {}", name, price)));
            }
        }
        if self.judge.model.trim().is_empty() {
            return Err(invalid("judge.model must not be empty"));
        }
        if self.judge.max_tokens == 0 {
            return Err(invalid("judge.max_tokens must be greater than 0"));
        }
        if self.judge.request_timeout_secs == 0 {
            return Err(invalid("judge.request_timeout_secs must be greater than 0"));
        }
        self.criterion_set().map(|_| ())
    }

    /// Build the validated criterion set.
    pub fn criterion_set(&self) -> Result<CriterionSet> {
        CriterionSet::new(self.criteria.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn pricing(&self) -> Pricing {
        Pricing {
            input_per_million: self.cost.input_per_million,
            output_per_million: self.cost.output_per_million,
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_concurrency: self.batch.max_concurrency,
            timeout: Duration::from_secs(self.batch.timeout_secs),
            retry: self.retry_policy(),
            pricing: self.pricing(),
        }
    }

    pub fn budget_policy(&self) -> BudgetPolicy {
        BudgetPolicy {
            limit_usd: self.cost.budget_limit_usd,
            warn_threshold: self.cost.warn_threshold,
        }
    }
}
