//! Judge prompt construction.

use crate::domain::{CriterionDescriptor, ParsedDocument};
use crate::judge::JudgeRequest;
use crate::scoring::CriticismMultiplier;

/// Upper bound on document characters quoted into one prompt.
pub const MAX_CONTENT_CHARS: usize = 10_000;

const SYSTEM_PROMPT: &str = "You are an experienced academic reviewer grading software project \
submissions. You answer with a single JSON object and nothing else.";

const RESPONSE_CONTRACT: &str = r#"IMPORTANT INSTRUCTIONS:
1. Respond ONLY with valid JSON (no markdown, no extra text)
2. Be specific and cite evidence with page numbers
3. Provide actionable suggestions for improvement
4. Adjust your strictness based on the criticism multiplier above

Required JSON format:
{
  "score": <float between 0-100>,
  "evidence": ["Page X: specific quote or finding", ...],
  "strengths": ["Specific strength", ...],
  "weaknesses": ["Specific weakness", ...],
  "suggestions": ["Actionable suggestion", ...],
  "severity": "critical" | "important" | "minor" | "strength"
}

Severity guidelines:
- "critical": Major issues that would cause project failure
- "important": Significant issues affecting quality/usability
- "minor": Small issues or missing polish
- "strength": No significant issues, highlight strengths"#;

/// Evaluation tone sent to the judge for a given multiplier.
pub fn tone(multiplier: CriticismMultiplier) -> &'static str {
    let m = multiplier.value();
    if m >= 1.5 {
        "VERY STRICT - Student claims excellence, demand perfection"
    } else if m >= 1.2 {
        "STRICT - High standards expected, thorough evaluation"
    } else if m >= 1.0 {
        "BALANCED - Standard academic evaluation"
    } else if m >= 0.8 {
        "ENCOURAGING - Focus on strengths, constructive feedback"
    } else {
        "SUPPORTIVE - Student aware of gaps, build on positives"
    }
}

fn rubric(criterion: &CriterionDescriptor) -> String {
    if criterion.prompt.trim().is_empty() {
        format!(
            "You are evaluating the \"{name}\" criterion for a software project submission.\n\
             Evaluate the provided document sections and code blocks based on this criterion: {name}.\n\
             Be thorough and specific. Reference concrete examples from the document.",
            name = criterion.name
        )
    } else {
        criterion.prompt.clone()
    }
}

/// Build the judge request for one criterion.
pub fn build_request(
    criterion: &CriterionDescriptor,
    document: &ParsedDocument,
    multiplier: CriticismMultiplier,
) -> JudgeRequest {
    let content = document.relevant_content(
        &criterion.keywords,
        criterion.evaluates_code,
        MAX_CONTENT_CHARS,
    );

    let prompt = format!(
        "{rubric}\n\nEVALUATION TONE: {tone}\nCRITICISM MULTIPLIER: {multiplier}x\n\n\
         CONTENT TO EVALUATE:\n{content}\n\n{contract}\n",
        rubric = rubric(criterion),
        tone = tone(multiplier),
        multiplier = multiplier.value(),
        content = content,
        contract = RESPONSE_CONTRACT,
    );

    JudgeRequest {
        criterion_id: criterion.id.clone(),
        system: SYSTEM_PROMPT.to_string(),
        prompt,
    }
}
