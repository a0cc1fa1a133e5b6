//! In-memory fakes for the judge and cache traits (testing only)
//!
//! Provides `ScriptedJudge` and `MemoryDocumentCache`, which satisfy the trait
//! contracts without network or filesystem access.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::cache::{self, DocumentCache, Fingerprint};
use crate::domain::{ParsedDocument, Severity};
use crate::judge::{Completion, JudgeClient, JudgeRequest, TaskError};
use crate::ledger::TokenUsage;

/// A well-formed verdict with the given score and severity.
pub fn verdict_json(score: f64, severity: Severity) -> String {
    json!({
        "score": score,
        "evidence": [format!("Page 1: evidence for a score of {}", score)],
        "strengths": ["clear structure"],
        "weaknesses": ["missing detail"],
        "suggestions": ["add examples"],
        "severity": severity.as_str(),
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// ScriptedJudge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Error(TaskError),
    Panic,
}

#[derive(Debug, Clone)]
struct Step {
    delay: Duration,
    reply: Reply,
}

/// Judge whose answers are scripted per criterion id.
///
/// Each call pops the next step for its criterion; the last step repeats once
/// the script is exhausted. A criterion without a script gets a permanent
/// error.
#[derive(Debug)]
pub struct ScriptedJudge {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, u32>>,
    usage: TokenUsage,
    model: String,
}

impl Default for ScriptedJudge {
    fn default() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            usage: TokenUsage {
                input_tokens: 1000,
                output_tokens: 200,
            },
            model: "scripted-judge".to_string(),
        }
    }
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, criterion_id: &str, delay: Duration, reply: Reply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(criterion_id.to_string())
            .or_default()
            .push_back(Step { delay, reply });
        self
    }

    /// Token usage reported with every completion.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn respond(self, criterion_id: &str, text: impl Into<String>) -> Self {
        self.push(criterion_id, Duration::ZERO, Reply::Text(text.into()))
    }

    pub fn respond_after(self, criterion_id: &str, delay: Duration, text: impl Into<String>) -> Self {
        self.push(criterion_id, delay, Reply::Text(text.into()))
    }

    pub fn fail(self, criterion_id: &str, error: TaskError) -> Self {
        self.push(criterion_id, Duration::ZERO, Reply::Error(error))
    }

    pub fn fail_after(self, criterion_id: &str, delay: Duration, error: TaskError) -> Self {
        self.push(criterion_id, delay, Reply::Error(error))
    }

    pub fn panic_on(self, criterion_id: &str) -> Self {
        self.push(criterion_id, Duration::ZERO, Reply::Panic)
    }

    /// Number of calls made for `criterion_id`.
    pub fn calls(&self, criterion_id: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(criterion_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn next_step(&self, criterion_id: &str) -> Option<Step> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(criterion_id.to_string())
            .or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(criterion_id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl JudgeClient for ScriptedJudge {
    async fn complete(&self, request: &JudgeRequest) -> Result<Completion, TaskError> {
        let Some(step) = self.next_step(&request.criterion_id) else {
            return Err(TaskError::Permanent(format!(
                "no scripted reply for {}",
                request.criterion_id
            )));
        };

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        match step.reply {
            Reply::Text(text) => Ok(Completion {
                text,
                usage: self.usage,
                model: self.model.clone(),
            }),
            Reply::Error(error) => Err(error),
            Reply::Panic => panic!("scripted judge panic for {}", request.criterion_id),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// MemoryDocumentCache
// ---------------------------------------------------------------------------

/// In-memory document cache backed by a `HashMap<Fingerprint, ParsedDocument>`.
#[derive(Debug, Default)]
pub struct MemoryDocumentCache {
    documents: Mutex<HashMap<Fingerprint, ParsedDocument>>,
}

impl MemoryDocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentCache for MemoryDocumentCache {
    fn get(&self, fingerprint: &Fingerprint) -> cache::Result<Option<ParsedDocument>> {
        Ok(self.documents.lock().unwrap().get(fingerprint).cloned())
    }

    fn put(&self, fingerprint: &Fingerprint, document: &ParsedDocument) -> cache::Result<()> {
        self.documents
            .lock()
            .unwrap()
            .insert(*fingerprint, document.clone());
        Ok(())
    }

    fn contains(&self, fingerprint: &Fingerprint) -> cache::Result<bool> {
        Ok(self.documents.lock().unwrap().contains_key(fingerprint))
    }

    fn remove(&self, fingerprint: &Fingerprint) -> cache::Result<bool> {
        Ok(self.documents.lock().unwrap().remove(fingerprint).is_some())
    }
}
