//! External content-rating client: video ID -> raw score in `[-100, 100]`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::LlmError;

#[async_trait]
pub trait ContentRatingClient: Send + Sync {
    async fn rate(&self, video_id: &str) -> Result<f64, LlmError>;
}

#[derive(Deserialize)]
struct RatingResponse {
    score: f64,
}

pub struct HttpContentRatingClient {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl HttpContentRatingClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ContentRatingClient for HttpContentRatingClient {
    async fn rate(&self, video_id: &str) -> Result<f64, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let response = self
            .client
            .get(format!("{}/rate/{}", self.base_url, video_id))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream { status: status.as_u16(), body });
        }

        let parsed: RatingResponse = response.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(parsed.score)
    }
}
