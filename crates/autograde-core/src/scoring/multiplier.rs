//! Criticism multiplier derived from the student's self-assessment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Severity;

/// Strictness applied to a run, one of 0.6, 0.8, 1.0, 1.2 or 1.5.
///
/// A high self-assessment buys stricter grading; a low one buys leniency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct CriticismMultiplier(f64);

impl CriticismMultiplier {
    pub const NEUTRAL: CriticismMultiplier = CriticismMultiplier(1.0);

    /// Look up the multiplier for a self-assessment, clamped to 0–100 first.
    pub fn from_self_assessment(self_assessment: i32) -> Self {
        let s = clamp_self_assessment(self_assessment);
        let value = match s {
            90..=100 => 1.5,
            80..=89 => 1.2,
            70..=79 => 1.0,
            60..=69 => 0.8,
            _ => 0.6,
        };
        CriticismMultiplier(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_strict(&self) -> bool {
        self.0 > 1.0
    }

    pub fn is_lenient(&self) -> bool {
        self.0 < 1.0
    }
}

impl Default for CriticismMultiplier {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for CriticismMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Self-assessments outside 0–100 are clamped, not rejected.
pub fn clamp_self_assessment(self_assessment: i32) -> u8 {
    self_assessment.clamp(0, 100) as u8
}

/// Score multipliers applied per severity before the criticism adjustment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeverityFactors {
    pub critical: f64,
    pub important: f64,
    pub minor: f64,
    pub strength: f64,
}

impl Default for SeverityFactors {
    fn default() -> Self {
        Self {
            critical: 0.5,
            important: 0.8,
            minor: 0.95,
            strength: 1.0,
        }
    }
}

impl SeverityFactors {
    pub fn factor(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Important => self.important,
            Severity::Minor => self.minor,
            Severity::Strength => self.strength,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.critical, self.important, self.minor, self.strength]
            .iter()
            .all(|f| f.is_finite() && (0.0..=1.0).contains(f))
    }
}

/// Adjust a raw score with the default severity factors.
pub fn adjust_score(score: f64, severity: Severity, multiplier: CriticismMultiplier) -> f64 {
    adjust_score_with(&SeverityFactors::default(), score, severity, multiplier)
}

/// Severity-scale a raw score, then apply the multiplier penalty or bonus.
///
/// The penalty and bonus are computed from the raw score, not the
/// severity-scaled one. A perfect raw score gets neither.
pub fn adjust_score_with(
    factors: &SeverityFactors,
    score: f64,
    severity: Severity,
    multiplier: CriticismMultiplier,
) -> f64 {
    let m = multiplier.value();
    let mut adjusted = score * factors.factor(severity);

    if score < 100.0 {
        if m > 1.0 {
            adjusted -= (100.0 - score) * (m - 1.0) * 0.2;
        } else if m < 1.0 {
            adjusted += (100.0 - score) * (1.0 - m) * 0.3;
        }
    }

    adjusted.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_table() {
        let cases = [
            (100, 1.5),
            (90, 1.5),
            (89, 1.2),
            (80, 1.2),
            (79, 1.0),
            (70, 1.0),
            (69, 0.8),
            (60, 0.8),
            (59, 0.6),
            (0, 0.6),
        ];
        for (s, expected) in cases {
            assert_eq!(CriticismMultiplier::from_self_assessment(s).value(), expected, "s = {s}");
        }
    }

    #[test]
    fn out_of_range_self_assessment_is_clamped() {
        assert_eq!(CriticismMultiplier::from_self_assessment(250).value(), 1.5);
        assert_eq!(CriticismMultiplier::from_self_assessment(-20).value(), 0.6);
        assert_eq!(clamp_self_assessment(101), 100);
        assert_eq!(clamp_self_assessment(-1), 0);
    }

    #[test]
    fn strict_penalty_uses_raw_score() {
        let m = CriticismMultiplier::from_self_assessment(95);
        // 80 * 0.8 - 20 * 0.5 * 0.2
        assert!((adjust_score(80.0, Severity::Important, m) - 62.0).abs() < 1e-9);
        // 60 * 0.5 - 40 * 0.5 * 0.2
        assert!((adjust_score(60.0, Severity::Critical, m) - 26.0).abs() < 1e-9);
    }

    #[test]
    fn lenient_bonus_is_clamped() {
        let m = CriticismMultiplier::from_self_assessment(10);
        // 90 * 1.0 + 10 * 0.4 * 0.3
        assert!((adjust_score(90.0, Severity::Strength, m) - 91.2).abs() < 1e-9);
        assert!(adjust_score(99.9, Severity::Strength, m) <= 100.0);
    }

    #[test]
    fn perfect_score_gets_no_penalty() {
        let m = CriticismMultiplier::from_self_assessment(100);
        assert_eq!(adjust_score(100.0, Severity::Strength, m), 100.0);
        assert_eq!(adjust_score(100.0, Severity::Critical, m), 50.0);
    }

    #[test]
    fn neutral_multiplier_only_scales() {
        let adjusted = adjust_score(50.0, Severity::Minor, CriticismMultiplier::NEUTRAL);
        assert!((adjusted - 47.5).abs() < 1e-9);
    }

    #[test]
    fn adjusted_score_stays_in_range() {
        let severities = [Severity::Critical, Severity::Important, Severity::Minor, Severity::Strength];
        for s in (0..=100).step_by(5) {
            let m = CriticismMultiplier::from_self_assessment(s);
            for severity in severities {
                for raw in 0..=100 {
                    let adjusted = adjust_score(raw as f64, severity, m);
                    assert!((0.0..=100.0).contains(&adjusted), "raw={raw} s={s} {severity}");
                }
            }
        }
    }

    #[test]
    fn severity_factor_validation() {
        assert!(SeverityFactors::default().is_valid());
        let bad = SeverityFactors {
            critical: -0.1,
            ..SeverityFactors::default()
        };
        assert!(!bad.is_valid());
    }
}
