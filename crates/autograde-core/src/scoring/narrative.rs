//! Comparison between the final grade and the self-assessment.

use serde::{Deserialize, Serialize};

use super::CriticismMultiplier;

/// Differences within this many points count as well calibrated.
pub const CALIBRATION_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Calibration {
    WellCalibrated,
    /// The final grade came out higher than the student expected.
    Underestimated,
    /// The final grade came out lower than the student expected.
    Overestimated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    pub self_assessment: u8,
    pub final_score: f64,
    /// `final_score - self_assessment`.
    pub difference: f64,
    pub calibration: Calibration,
    pub accuracy: String,
    pub message: String,
}

fn accuracy_band(abs_difference: f64) -> &'static str {
    if abs_difference < 2.0 {
        "very accurate"
    } else if abs_difference < 5.0 {
        "quite accurate"
    } else if abs_difference < 10.0 {
        "reasonably accurate"
    } else {
        "somewhat inaccurate"
    }
}

fn strictness_note(multiplier: CriticismMultiplier) -> &'static str {
    let m = multiplier.value();
    if m >= 1.5 {
        " (evaluated with very strict standards due to high self-grade)"
    } else if m >= 1.2 {
        " (evaluated with strict standards)"
    } else if m <= 0.6 {
        " (evaluated with supportive standards)"
    } else if m <= 0.8 {
        " (evaluated with encouraging standards)"
    } else {
        ""
    }
}

/// Describe how the final grade relates to the self-assessment.
pub fn compare(
    final_score: f64,
    self_assessment: u8,
    multiplier: CriticismMultiplier,
    insufficient_data: bool,
) -> Comparison {
    let difference = final_score - f64::from(self_assessment);
    let abs_difference = difference.abs();
    let accuracy = accuracy_band(abs_difference);

    let (calibration, direction, interpretation) = if difference > CALIBRATION_TOLERANCE {
        (
            Calibration::Underestimated,
            format!("higher than your self-assessment by {:.1} points", difference),
            "You were more modest than necessary.",
        )
    } else if difference < -CALIBRATION_TOLERANCE {
        (
            Calibration::Overestimated,
            format!("lower than your self-assessment by {:.1} points", abs_difference),
            "You may have overestimated some aspects.",
        )
    } else {
        (
            Calibration::WellCalibrated,
            "very close to your self-assessment".to_string(),
            "Your self-evaluation was well-calibrated.",
        )
    };

    let message = if insufficient_data {
        format!(
            "No criterion could be evaluated, so the final grade of {:.2} does not reflect \
             the submission and cannot be compared with your self-assessment of {}.",
            final_score, self_assessment
        )
    } else {
        format!(
            "Your self-assessment was {}. The final grade is {}. {}{}",
            accuracy,
            direction,
            interpretation,
            strictness_note(multiplier)
        )
    };

    Comparison {
        self_assessment,
        final_score,
        difference,
        calibration,
        accuracy: accuracy.to_string(),
        message,
    }
}
