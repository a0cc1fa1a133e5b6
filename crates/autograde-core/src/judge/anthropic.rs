//! Anthropic Messages API judge.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Completion, JudgeClient, JudgeRequest, TaskError};
use crate::ledger::TokenUsage;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

/// Request settings for [`AnthropicClient`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JudgeSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub base_url: String,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            request_timeout_secs: 60,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub struct AnthropicClient {
    settings: JudgeSettings,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, settings: JudgeSettings) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            settings,
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl JudgeClient for AnthropicClient {
    async fn complete(&self, request: &JudgeRequest) -> Result<Completion, TaskError> {
        let body = json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });

        debug!(criterion_id = %request.criterion_id, model = %self.settings.model, "sending judge request");

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskError::Transient(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(TaskError::from_status(status.as_u16(), &error_text));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| TaskError::Transient(format!("failed to read response body: {}", e)))?;

        parse_response(&self.settings.model, &json)
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

/// Extract `content[0].text` and the usage block from a Messages API reply.
///
/// A reply without text (refusal, `max_tokens` cut-off) was still billed, so it
/// comes back as a completion with empty text and the task records its usage
/// before rejecting the verdict.
pub fn parse_response(requested_model: &str, json: &Value) -> Result<Completion, TaskError> {
    let text = match json.pointer("/content/0/text").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => {
            let stop_reason = json.get("stop_reason").and_then(Value::as_str).unwrap_or("unknown");
            warn!(stop_reason = %stop_reason, "judge reply has no text content");
            String::new()
        }
    };

    let usage = TokenUsage {
        input_tokens: json
            .pointer("/usage/input_tokens")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        output_tokens: json
            .pointer("/usage/output_tokens")
            .and_then(Value::as_i64)
            .unwrap_or(0),
    };

    let model = json
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(requested_model)
        .to_string();

    Ok(Completion { text, usage, model })
}
