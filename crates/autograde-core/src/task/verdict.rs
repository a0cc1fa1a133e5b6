//! Parsing of the judge's JSON verdict.

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{CriterionEvaluation, Severity};

#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("invalid verdict JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("score {0} outside 0-100")]
    ScoreOutOfRange(f64),
}

#[derive(Debug, Deserialize)]
struct Verdict {
    score: f64,
    evidence: Vec<String>,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    suggestions: Vec<String>,
    severity: Severity,
}

/// Remove an optional surrounding Markdown code fence.
fn strip_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse a judge reply into an evaluation of `criterion_id`.
pub fn parse_verdict(criterion_id: &str, text: &str) -> Result<CriterionEvaluation, VerdictError> {
    let verdict: Verdict = serde_json::from_str(strip_fences(text))?;

    if !verdict.score.is_finite() || !(0.0..=100.0).contains(&verdict.score) {
        return Err(VerdictError::ScoreOutOfRange(verdict.score));
    }

    Ok(CriterionEvaluation {
        criterion_id: criterion_id.to_string(),
        score: (verdict.score * 100.0).round() / 100.0,
        evidence: verdict.evidence,
        strengths: verdict.strengths,
        weaknesses: verdict.weaknesses,
        suggestions: verdict.suggestions,
        severity: verdict.severity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "score": 82.456,
        "evidence": ["Page 3: setup section"],
        "strengths": ["clear"],
        "weaknesses": [],
        "suggestions": ["add screenshots"],
        "severity": "minor"
    }"#;

    #[test]
    fn parses_plain_json() {
        let eval = parse_verdict("readme", VALID).unwrap();
        assert_eq!(eval.criterion_id, "readme");
        assert_eq!(eval.score, 82.46);
        assert_eq!(eval.severity, Severity::Minor);
        assert_eq!(eval.evidence, vec!["Page 3: setup section"]);
    }

    #[test]
    fn strips_code_fences() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_verdict("readme", &fenced).is_ok());

        let bare_fence = format!("```\n{}\n```", VALID);
        assert!(parse_verdict("readme", &bare_fence).is_ok());
    }

    #[test]
    fn missing_field_rejected() {
        let text = r#"{"score": 50, "evidence": [], "strengths": [], "weaknesses": [], "severity": "minor"}"#;
        assert!(matches!(
            parse_verdict("x", text),
            Err(VerdictError::InvalidJson(_))
        ));
    }

    #[test]
    fn unknown_severity_rejected() {
        let text = VALID.replace("\"minor\"", "\"catastrophic\"");
        assert!(parse_verdict("x", &text).is_err());
    }

    #[test]
    fn out_of_range_score_rejected() {
        let text = VALID.replace("82.456", "140");
        assert!(matches!(
            parse_verdict("x", &text),
            Err(VerdictError::ScoreOutOfRange(s)) if s == 140.0
        ));
        let negative = VALID.replace("82.456", "-1");
        assert!(parse_verdict("x", &negative).is_err());
    }

    #[test]
    fn prose_rejected() {
        assert!(parse_verdict("x", "I think this deserves an 80.").is_err());
    }
}
