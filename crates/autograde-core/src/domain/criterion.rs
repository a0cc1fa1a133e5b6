//! Criterion descriptors and the validated criterion set of a run.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::error::{GradeError, Result};

/// Category used when a descriptor does not name one.
pub const DEFAULT_CATEGORY: &str = "Other";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// One weighted rubric dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionDescriptor {
    /// Unique identifier (e.g. `"readme"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Weight in the final grade, in (0, 1].
    pub weight: f64,
    /// Category tag for the breakdown.
    #[serde(default = "default_category")]
    pub category: String,
    /// Rubric text sent to the judge.
    #[serde(default)]
    pub prompt: String,
    /// Keywords used to pick the relevant parts of the document.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Whether code listings are quoted into the prompt.
    #[serde(default)]
    pub evaluates_code: bool,
}

impl CriterionDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            category: default_category(),
            prompt: String::new(),
            keywords: Vec::new(),
            evaluates_code: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_code(mut self) -> Self {
        self.evaluates_code = true;
        self
    }

    /// Check the shape of this descriptor in isolation.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(GradeError::InvalidCriterion {
                id: self.id.clone(),
                reason: "id must not be empty".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(GradeError::InvalidCriterion {
                id: self.id.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
        if !(self.weight > 0.0 && self.weight <= 1.0) {
            return Err(GradeError::InvalidWeight {
                id: self.id.clone(),
                weight: self.weight,
            });
        }
        Ok(())
    }
}

/// Closed, validated, ordered list of criteria for one run.
///
/// Built once at run start; the order is the order outcomes are reported in.
#[derive(Debug, Clone, Default)]
pub struct CriterionSet {
    criteria: Vec<Arc<CriterionDescriptor>>,
}

impl CriterionSet {
    /// Validate every descriptor and reject duplicate ids.
    pub fn new(descriptors: Vec<CriterionDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut criteria = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            descriptor.validate()?;
            if !seen.insert(descriptor.id.clone()) {
                return Err(GradeError::DuplicateCriterion(descriptor.id));
            }
            criteria.push(Arc::new(descriptor));
        }
        Ok(Self { criteria })
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CriterionDescriptor>> {
        self.criteria.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<CriterionDescriptor>> {
        self.criteria.iter().find(|c| c.id == id)
    }

    /// Sum of configured weights (not necessarily 1.0).
    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }
}
