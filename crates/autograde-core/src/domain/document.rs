//! Parsed submission document.
//!
//! Produced by the upstream PDF parser and shared read-only across every
//! evaluation task of a run.

use serde::{Deserialize, Serialize};

/// Maximum number of code blocks quoted into one criterion prompt.
const MAX_CODE_BLOCKS: usize = 10;

/// A titled section of the submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub content: String,
    /// 1-based page where the section starts.
    pub page: u32,
}

/// A code listing extracted from the submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeBlock {
    pub content: String,
    pub page: u32,
    #[serde(default)]
    pub language: Option<String>,
}

/// Immutable parse result of one submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedDocument {
    pub total_pages: u32,
    pub full_text: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub code_blocks: Vec<CodeBlock>,
}

impl ParsedDocument {
    /// Collect the content relevant to a keyword set.
    ///
    /// A section is relevant when any keyword occurs (case-insensitively) in
    /// its title or body. When `include_code` is set, up to ten code blocks are
    /// appended. If nothing matches, the first `max_chars` characters of the
    /// full text are returned instead.
    pub fn relevant_content(&self, keywords: &[String], include_code: bool, max_chars: usize) -> String {
        let needles: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let mut parts: Vec<String> = self
            .sections
            .iter()
            .filter(|section| {
                let title = section.title.to_lowercase();
                let body = section.content.to_lowercase();
                needles
                    .iter()
                    .any(|needle| title.contains(needle) || body.contains(needle))
            })
            .map(|section| format!("## {} (page {})\n{}\n", section.title, section.page, section.content))
            .collect();

        if include_code {
            for block in self.code_blocks.iter().take(MAX_CODE_BLOCKS) {
                let tag = block
                    .language
                    .as_deref()
                    .map(|l| format!(" ({l})"))
                    .unwrap_or_default();
                parts.push(format!(
                    "### Code Block{tag}, page {}\n```\n{}\n```\n",
                    block.page, block.content
                ));
            }
        }

        if parts.is_empty() {
            return truncate_chars(&self.full_text, max_chars).to_string();
        }
        parts.join("\n")
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParsedDocument {
        ParsedDocument {
            total_pages: 3,
            full_text: "Intro text. Installation steps. Tests.".to_string(),
            sections: vec![
                Section {
                    title: "Installation".to_string(),
                    content: "Run cargo install.".to_string(),
                    page: 1,
                },
                Section {
                    title: "Testing".to_string(),
                    content: "We use unit tests with high coverage.".to_string(),
                    page: 2,
                },
            ],
            code_blocks: vec![CodeBlock {
                content: "fn main() {}".to_string(),
                page: 3,
                language: Some("rust".to_string()),
            }],
        }
    }

    #[test]
    fn matches_keywords_in_title_and_body() {
        let doc = sample();
        let content = doc.relevant_content(&["COVERAGE".to_string()], false, 100);
        assert!(content.contains("## Testing"));
        assert!(!content.contains("Installation"));
    }

    #[test]
    fn includes_code_blocks_when_requested() {
        let doc = sample();
        let content = doc.relevant_content(&["installation".to_string()], true, 100);
        assert!(content.contains("## Installation"));
        assert!(content.contains("Code Block (rust)"));
        assert!(content.contains("fn main() {}"));
    }

    #[test]
    fn falls_back_to_truncated_full_text() {
        let doc = sample();
        let content = doc.relevant_content(&["nothing-matches".to_string()], false, 5);
        assert_eq!(content, "Intro");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
