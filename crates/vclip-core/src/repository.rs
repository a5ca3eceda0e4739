//! Persistence collaborator traits.
//!
//! The core logic depends only on these interfaces; `vclip-api` supplies a
//! `sqlx`-backed Postgres implementation and an in-memory test double.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use vclip_models::{ChatMessage, ChatRole, EnrichmentLevel, Summary};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait SummaryRepository: Send + Sync {
    async fn get_summary(&self, summary_id: Uuid) -> RepoResult<Summary>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn append_message(
        &self,
        summary_id: Uuid,
        user_id: &str,
        role: ChatRole,
        content: &str,
        web_search_used: bool,
        fact_checked: bool,
        sources: &[String],
        enrichment_level: EnrichmentLevel,
    ) -> RepoResult<ChatMessage>;

    async fn recent_messages(&self, summary_id: Uuid, limit: usize) -> RepoResult<Vec<ChatMessage>>;
}

/// Per-user quota counters (`chat_quotas`, `web_search_usage`).
#[async_trait]
pub trait QuotaRepository: Send + Sync {
    async fn daily_chat_count(&self, user_id: &str, day: DateTime<Utc>) -> RepoResult<i64>;
    async fn video_chat_count(&self, user_id: &str, summary_id: Uuid) -> RepoResult<i64>;
    async fn monthly_web_search_count(&self, user_id: &str, month: DateTime<Utc>) -> RepoResult<i64>;
    async fn increment_daily_chat(&self, user_id: &str, day: DateTime<Utc>) -> RepoResult<()>;
    async fn increment_monthly_web_search(&self, user_id: &str, month: DateTime<Utc>) -> RepoResult<()>;
}
