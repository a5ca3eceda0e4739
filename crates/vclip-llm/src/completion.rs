//! OpenAI-compatible chat-completion client.
//!
//! Mirrors the teacher's `GeminiClient::generate_more_scenes`: try a list of
//! models in order, log each attempt, strip markdown code fences before
//! parsing JSON bodies, and surface the last error if every model fails.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

pub struct CompletionRequest {
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    /// Preferred model; falls back through `fallback_models` on failure.
    pub model: String,
    pub fallback_models: Vec<String>,
    /// When set, the response is expected to be a JSON document matching
    /// this rough shape; markdown fences are stripped before parsing.
    pub expect_json: bool,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw completion text (or JSON text, if `expect_json` was set).
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

pub struct HttpCompletionClient {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl HttpCompletionClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    async fn call_model(&self, model: &str, req: &CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;
        let body = OpenAiChatRequest {
            model,
            messages: &req.messages,
            temperature: req.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("no choices in completion response".into()))
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let mut models = vec![request.model.clone()];
        models.extend(request.fallback_models.clone());

        let mut last_error = None;
        for model in &models {
            debug!(model = model.as_str(), "attempting chat completion");
            match self.call_model(model, &request).await {
                Ok(text) => {
                    let cleaned = if request.expect_json { strip_code_fence(&text) } else { text };
                    return Ok(cleaned);
                }
                Err(err) => {
                    warn!(model = model.as_str(), error = %err, "completion model failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::Exhausted))
    }
}

/// Strip ```json ... ``` or ``` ... ``` fences the way the teacher's Gemini
/// client does before calling `serde_json::from_str`.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim().to_string()
}

/// Parse a `{"queries": [...]}`-shaped completion response; used by the
/// query reformulator.
pub fn parse_json_value(text: &str) -> Result<Value, LlmError> {
    serde_json::from_str(&strip_code_fence(text)).map_err(|e| LlmError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_plain_fence() {
        assert_eq!(strip_code_fence("```\nhello\n```"), "hello");
    }

    #[test]
    fn passes_through_unfenced_text() {
        assert_eq!(strip_code_fence("plain"), "plain");
    }
}
