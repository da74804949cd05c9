//! HTTP judge adapters.
//!
//! One adapter covers three wire families:
//!
//! | Format | Endpoint | Auth |
//! |--------|----------|------|
//! | [`WireFormat::OpenAiChat`] | `{base}/chat/completions` | `Authorization: Bearer` |
//! | [`WireFormat::AnthropicMessages`] | `{base}/messages` | `x-api-key` + `anthropic-version` |
//! | [`WireFormat::GeminiGenerate`] | `{base}/models/{model}:generateContent` | `x-goog-api-key` |
//!
//! OpenAI-compatible endpoints (xAI, Perplexity, local gateways) only need
//! a different base URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{JudgeClient, JudgeInstruction, JudgeResponse, ResponseStatus};
use crate::normalize::normalize;
use crate::query::DisputeQuery;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const EXCERPT_CHARS: usize = 200;

/// Request/response shape spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireFormat {
    /// OpenAI chat completions and compatible APIs.
    #[serde(rename = "openai")]
    OpenAiChat,
    /// Anthropic messages API.
    #[serde(rename = "anthropic")]
    AnthropicMessages,
    /// Google Gemini generateContent.
    #[serde(rename = "gemini")]
    GeminiGenerate,
}

impl WireFormat {
    /// Public base URL used when none is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            WireFormat::OpenAiChat => "https://api.openai.com/v1",
            WireFormat::AnthropicMessages => "https://api.anthropic.com/v1",
            WireFormat::GeminiGenerate => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

/// A judge reached over HTTPS.
#[derive(Clone)]
pub struct HttpJudge {
    provider: String,
    model: String,
    format: WireFormat,
    base_url: String,
    api_key: String,
    max_tokens: u32,
    instruction: JudgeInstruction,
    client: reqwest::Client,
}

impl fmt::Debug for HttpJudge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpJudge")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("format", &self.format)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl HttpJudge {
    /// Creates a judge with the format's default base URL and instruction.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        format: WireFormat,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            format,
            base_url: format.default_base_url().to_string(),
            api_key: api_key.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            instruction: JudgeInstruction::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the base URL (no trailing slash needed).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the completion token bound.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the system instruction.
    pub fn with_instruction(mut self, instruction: JudgeInstruction) -> Self {
        self.instruction = instruction;
        self
    }

    /// Shares an existing connection pool.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The wire format.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Full request URL.
    pub fn endpoint(&self) -> String {
        match self.format {
            WireFormat::OpenAiChat => format!("{}/chat/completions", self.base_url),
            WireFormat::AnthropicMessages => format!("{}/messages", self.base_url),
            WireFormat::GeminiGenerate => {
                format!("{}/models/{}:generateContent", self.base_url, self.model)
            }
        }
    }

    fn request(&self, body: &Value, timeout: Duration) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(body);
        match self.format {
            WireFormat::OpenAiChat => builder.bearer_auth(&self.api_key),
            WireFormat::AnthropicMessages => builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            WireFormat::GeminiGenerate => builder.header("x-goog-api-key", &self.api_key),
        }
    }

    fn failure(&self, status: ResponseStatus, detail: String, started: Instant) -> JudgeResponse {
        JudgeResponse::abstain(&self.provider, &self.model, status, detail)
            .with_latency(started.elapsed())
    }
}

#[async_trait]
impl JudgeClient for HttpJudge {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, query: &DisputeQuery, timeout: Duration) -> JudgeResponse {
        let started = Instant::now();
        let user = self.instruction.render_user_prompt(query);
        let body = build_body(
            self.format,
            &self.model,
            self.instruction.system_prompt(),
            &user,
            self.max_tokens,
        );

        debug!("Calling judge {} at {}", self.provider, self.endpoint());

        let response = match self.request(&body, timeout).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return JudgeResponse::timed_out(&self.provider, &self.model, timeout)
                    .with_latency(started.elapsed());
            }
            Err(e) => {
                return self.failure(
                    ResponseStatus::Error,
                    format!("request failed: {}", e.without_url()),
                    started,
                );
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => {
                return JudgeResponse::timed_out(&self.provider, &self.model, timeout)
                    .with_latency(started.elapsed());
            }
            Err(e) => {
                return self.failure(
                    ResponseStatus::Error,
                    format!("reading body failed: {}", e.without_url()),
                    started,
                );
            }
        };

        if !status.is_success() {
            return self.failure(
                ResponseStatus::Error,
                format!("HTTP {}: {}", status.as_u16(), excerpt(&text)),
                started,
            );
        }

        let payload: Value = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(e) => {
                let mut response = self.failure(
                    ResponseStatus::Malformed,
                    format!("response body is not JSON: {}", e),
                    started,
                );
                response.reasoning = excerpt(&text);
                return response;
            }
        };

        match extract_text(self.format, &payload) {
            Some(content) if !content.trim().is_empty() => {
                normalize(&self.provider, &self.model, &content, started.elapsed())
            }
            _ => {
                let mut response = self.failure(
                    ResponseStatus::Malformed,
                    "empty completion".to_string(),
                    started,
                );
                response.reasoning = excerpt(&text);
                response
            }
        }
    }
}

/// Builds the request body for a wire format.
pub(crate) fn build_body(
    format: WireFormat,
    model: &str,
    system: &str,
    user: &str,
    max_tokens: u32,
) -> Value {
    match format {
        WireFormat::OpenAiChat => json!({
            "model": model,
            "temperature": 0,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        }),
        WireFormat::AnthropicMessages => json!({
            "model": model,
            "temperature": 0,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [
                {"role": "user", "content": user},
            ],
        }),
        WireFormat::GeminiGenerate => json!({
            "systemInstruction": {"parts": [{"text": system}]},
            "contents": [
                {"role": "user", "parts": [{"text": user}]},
            ],
            "generationConfig": {
                "temperature": 0,
                "maxOutputTokens": max_tokens,
            },
        }),
    }
}

/// Pulls the completion text out of a provider response.
pub(crate) fn extract_text(format: WireFormat, payload: &Value) -> Option<String> {
    match format {
        WireFormat::OpenAiChat => payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string),
        WireFormat::AnthropicMessages => {
            let blocks = payload.get("content")?.as_array()?;
            Some(join_text(blocks.iter().filter(|block| {
                block.get("type").and_then(Value::as_str) == Some("text")
            })))
        }
        WireFormat::GeminiGenerate => {
            let parts = payload
                .pointer("/candidates/0/content/parts")?
                .as_array()?;
            Some(join_text(parts.iter()))
        }
    }
}

fn join_text<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut)
}
