//! Chat message, summary, and quota types.

pub use crate::plan::EnrichmentLevel;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schema version for `chat_messages` rows. Checked at boot against the
/// `schema_migrations` table; a mismatch aborts startup rather than
/// falling back to a degraded write shape at request time.
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A persisted chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatMessage {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub summary_id: uuid::Uuid,
    pub role: ChatRole,
    pub content: String,
    pub web_search_used: bool,
    pub fact_checked: bool,
    pub sources: Vec<String>,
    pub enrichment_level: EnrichmentLevel,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The read-only collaborator record the chat service consults for context.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub video_id: String,
    pub video_title: String,
    pub summary_content: String,
    pub transcript_context: String,
    pub language: String,
}

/// Current usage against a user's plan-derived quotas.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuotaStatus {
    pub daily_chat_count: i64,
    pub daily_chat_limit: i64,
    pub video_chat_count: i64,
    pub video_chat_limit: i64,
    pub monthly_web_search_count: i64,
    pub monthly_web_search_limit: i64,
}
