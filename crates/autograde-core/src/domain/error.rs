//! Run-aborting error taxonomy for autograde.
//!
//! Only problems detected before any evaluation task starts end up here.
//! Task-level problems are carried as [`EvaluationFailure`] values instead.
//!
//! [`EvaluationFailure`]: crate::domain::evaluation::EvaluationFailure

/// Autograde configuration and setup errors.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    #[error("invalid criterion {id:?}: {reason}")]
    InvalidCriterion { id: String, reason: String },

    #[error("duplicate criterion id: {0}")]
    DuplicateCriterion(String),

    #[error("invalid weight {weight} for criterion {id:?}: must be in (0, 1]")]
    InvalidWeight { id: String, weight: f64 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for autograde setup operations.
pub type Result<T> = std::result::Result<T, GradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_weight_display() {
        let err = GradeError::InvalidWeight {
            id: "readme".to_string(),
            weight: -0.2,
        };
        let msg = err.to_string();
        assert!(msg.contains("readme"));
        assert!(msg.contains("-0.2"));
    }

    #[test]
    fn test_duplicate_criterion_display() {
        let err = GradeError::DuplicateCriterion("unit_tests".to_string());
        assert!(err.to_string().contains("duplicate criterion id"));
        assert!(err.to_string().contains("unit_tests"));
    }
}
