//! LLM search-augmented completion client (OpenAI-compatible chat schema
//! extended with a `citations` field), used by the enrichment controller's
//! fact-checking path.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LlmError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAugmentedResponse {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[async_trait]
pub trait SearchAugmentedClient: Send + Sync {
    async fn search_and_answer(&self, query: &str, context: &str) -> Result<SearchAugmentedResponse, LlmError>;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    model: &'a str,
    query: &'a str,
    context: &'a str,
}

#[derive(Deserialize)]
struct SearchResponseBody {
    answer: String,
    #[serde(default)]
    citations: Vec<String>,
}

pub struct HttpSearchClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: Client,
}

impl HttpSearchClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SearchAugmentedClient for HttpSearchClient {
    async fn search_and_answer(&self, query: &str, context: &str) -> Result<SearchAugmentedResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .json(&SearchRequest {
                model: &self.model,
                query,
                context,
            })
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "search-augmented call failed");
            return Err(LlmError::Upstream { status: status.as_u16(), body });
        }

        let parsed: SearchResponseBody = response.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(SearchAugmentedResponse {
            text: parsed.answer,
            sources: parsed.citations,
        })
    }
}
