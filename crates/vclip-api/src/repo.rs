//! Postgres-backed and in-memory implementations of `vclip_core::repository`.
//!
//! Mirrors the teacher's collaborator-trait-over-a-concrete-backend shape
//! (`FirestoreClient` behind `vclip_firestore`), swapped here for `sqlx`
//! since the core's persisted state (§6) is explicitly relational.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;
use vclip_core::repository::{ChatRepository, QuotaRepository, RepoResult, RepositoryError, SummaryRepository};
use vclip_models::chat::SCHEMA_VERSION;
use vclip_models::{ChatMessage, ChatRole, EnrichmentLevel, Summary};

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Connects and checks `schema_migrations` against `SCHEMA_VERSION`.
    /// A mismatch (or a missing row) is a fatal config-time error rather
    /// than a per-write fallback — the schema is expected to be migrated
    /// ahead of deploy, not patched around at request time.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;

        let row = sqlx::query("SELECT version FROM schema_migrations ORDER BY version DESC LIMIT 1")
            .fetch_optional(&pool)
            .await?;
        let current: i32 = match row {
            Some(row) => row.try_get("version")?,
            None => {
                return Err(sqlx::Error::Configuration(
                    format!("schema_migrations table is empty; expected version {SCHEMA_VERSION}").into(),
                ))
            }
        };
        if current != SCHEMA_VERSION {
            return Err(sqlx::Error::Configuration(
                format!("schema version mismatch: database is at {current}, binary expects {SCHEMA_VERSION}").into(),
            ));
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl SummaryRepository for PgRepository {
    async fn get_summary(&self, summary_id: Uuid) -> RepoResult<Summary> {
        let row = sqlx::query(
            r#"SELECT id, user_id, video_id, video_title, summary_content, transcript_context, language
               FROM summaries WHERE id = $1"#,
        )
        .bind(summary_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Summary {
            id: row.try_get("id").map_err(row_err)?,
            user_id: row.try_get("user_id").map_err(row_err)?,
            video_id: row.try_get("video_id").map_err(row_err)?,
            video_title: row.try_get("video_title").map_err(row_err)?,
            summary_content: row.try_get("summary_content").map_err(row_err)?,
            transcript_context: row.try_get("transcript_context").map_err(row_err)?,
            language: row.try_get("language").map_err(row_err)?,
        })
    }
}

fn row_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

#[async_trait]
impl ChatRepository for PgRepository {
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
    ) -> RepoResult<ChatMessage> {
        let role_str = match role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        let level_str = format!("{enrichment_level:?}").to_lowercase();
        let sources_json = serde_json::to_value(sources).unwrap_or_default();
        let id = Uuid::new_v4();

        let row = sqlx::query(
            r#"INSERT INTO chat_messages
                 (id, user_id, summary_id, role, content, web_search_used, fact_checked, sources_json, enrichment_level, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
               RETURNING created_at"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(summary_id)
        .bind(role_str)
        .bind(content)
        .bind(web_search_used)
        .bind(fact_checked)
        .bind(sources_json)
        .bind(level_str)
        .fetch_one(&self.pool)
        .await
        .map_err(row_err)?;

        Ok(ChatMessage {
            id,
            user_id: user_id.to_string(),
            summary_id,
            role,
            content: content.to_string(),
            web_search_used,
            fact_checked,
            sources: sources.to_vec(),
            enrichment_level,
            created_at: row.try_get("created_at").map_err(row_err)?,
        })
    }

    async fn recent_messages(&self, summary_id: Uuid, limit: usize) -> RepoResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, summary_id, role, content, web_search_used, fact_checked, sources_json, enrichment_level, created_at
               FROM chat_messages WHERE summary_id = $1 ORDER BY created_at DESC LIMIT $2"#,
        )
        .bind(summary_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(row_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let role: String = row.try_get("role").map_err(row_err)?;
            let enrichment_level: String = row.try_get("enrichment_level").map_err(row_err)?;
            let sources_json: serde_json::Value = row.try_get("sources_json").map_err(row_err)?;
            messages.push(ChatMessage {
                id: row.try_get("id").map_err(row_err)?,
                user_id: row.try_get("user_id").map_err(row_err)?,
                summary_id: row.try_get("summary_id").map_err(row_err)?,
                role: if role == "assistant" { ChatRole::Assistant } else { ChatRole::User },
                content: row.try_get("content").map_err(row_err)?,
                web_search_used: row.try_get("web_search_used").map_err(row_err)?,
                fact_checked: row.try_get("fact_checked").map_err(row_err)?,
                sources: serde_json::from_value(sources_json).unwrap_or_default(),
                enrichment_level: parse_enrichment_level(&enrichment_level),
                created_at: row.try_get("created_at").map_err(row_err)?,
            });
        }
        messages.reverse();
        Ok(messages)
    }
}

fn parse_enrichment_level(s: &str) -> EnrichmentLevel {
    match s {
        "light" => EnrichmentLevel::Light,
        "full" => EnrichmentLevel::Full,
        "deep" => EnrichmentLevel::Deep,
        _ => EnrichmentLevel::None,
    }
}

#[async_trait]
impl QuotaRepository for PgRepository {
    async fn daily_chat_count(&self, user_id: &str, day: DateTime<Utc>) -> RepoResult<i64> {
        let row = sqlx::query("SELECT daily_count FROM chat_quotas WHERE user_id = $1 AND quota_date = $2")
            .bind(user_id)
            .bind(day.date_naive())
            .fetch_optional(&self.pool)
            .await
            .map_err(row_err)?;
        match row {
            Some(row) => row.try_get("daily_count").map_err(row_err),
            None => Ok(0),
        }
    }

    async fn video_chat_count(&self, user_id: &str, summary_id: Uuid) -> RepoResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM chat_messages WHERE user_id = $1 AND summary_id = $2 AND role = 'user'",
        )
        .bind(user_id)
        .bind(summary_id)
        .fetch_one(&self.pool)
        .await
        .map_err(row_err)?;
        row.try_get("count").map_err(row_err)
    }

    async fn monthly_web_search_count(&self, user_id: &str, month: DateTime<Utc>) -> RepoResult<i64> {
        let month_year = format!("{:04}-{:02}", month.year(), month.month());
        let row = sqlx::query("SELECT search_count FROM web_search_usage WHERE user_id = $1 AND month_year = $2")
            .bind(user_id)
            .bind(month_year)
            .fetch_optional(&self.pool)
            .await
            .map_err(row_err)?;
        match row {
            Some(row) => row.try_get("search_count").map_err(row_err),
            None => Ok(0),
        }
    }

    async fn increment_daily_chat(&self, user_id: &str, day: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query(
            r#"INSERT INTO chat_quotas (user_id, quota_date, daily_count)
               VALUES ($1, $2, 1)
               ON CONFLICT (user_id, quota_date) DO UPDATE SET daily_count = chat_quotas.daily_count + 1"#,
        )
        .bind(user_id)
        .bind(day.date_naive())
        .execute(&self.pool)
        .await
        .map_err(row_err)?;
        Ok(())
    }

    async fn increment_monthly_web_search(&self, user_id: &str, month: DateTime<Utc>) -> RepoResult<()> {
        let month_year = format!("{:04}-{:02}", month.year(), month.month());
        sqlx::query(
            r#"INSERT INTO web_search_usage (user_id, month_year, search_count, last_search_at)
               VALUES ($1, $2, 1, now())
               ON CONFLICT (user_id, month_year)
               DO UPDATE SET search_count = web_search_usage.search_count + 1, last_search_at = now()"#,
        )
        .bind(user_id)
        .bind(month_year)
        .execute(&self.pool)
        .await
        .map_err(row_err)?;
        Ok(())
    }
}

/// In-process repository used for local development without Postgres and
/// for integration tests, mirroring the teacher's pattern of pairing a
/// real backend with a lightweight in-memory double.
#[derive(Default)]
pub struct InMemoryRepository {
    summaries: Mutex<HashMap<Uuid, Summary>>,
    messages: Mutex<Vec<ChatMessage>>,
    daily_counts: Mutex<HashMap<(String, NaiveDate), i64>>,
    web_search_counts: Mutex<HashMap<(String, String), i64>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_summary(&self, summary: Summary) {
        self.summaries.lock().unwrap().insert(summary.id, summary);
    }
}

#[async_trait]
impl SummaryRepository for InMemoryRepository {
    async fn get_summary(&self, summary_id: Uuid) -> RepoResult<Summary> {
        self.summaries.lock().unwrap().get(&summary_id).cloned().ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl ChatRepository for InMemoryRepository {
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
    ) -> RepoResult<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            summary_id,
            role,
            content: content.to_string(),
            web_search_used,
            fact_checked,
            sources: sources.to_vec(),
            enrichment_level,
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn recent_messages(&self, summary_id: Uuid, limit: usize) -> RepoResult<Vec<ChatMessage>> {
        let guard = self.messages.lock().unwrap();
        Ok(guard.iter().filter(|m| m.summary_id == summary_id).rev().take(limit).rev().cloned().collect())
    }
}

#[async_trait]
impl QuotaRepository for InMemoryRepository {
    async fn daily_chat_count(&self, user_id: &str, day: DateTime<Utc>) -> RepoResult<i64> {
        Ok(*self.daily_counts.lock().unwrap().get(&(user_id.to_string(), day.date_naive())).unwrap_or(&0))
    }

    async fn video_chat_count(&self, user_id: &str, summary_id: Uuid) -> RepoResult<i64> {
        let guard = self.messages.lock().unwrap();
        Ok(guard.iter().filter(|m| m.user_id == user_id && m.summary_id == summary_id && m.role == ChatRole::User).count() as i64)
    }

    async fn monthly_web_search_count(&self, user_id: &str, month: DateTime<Utc>) -> RepoResult<i64> {
        let key = (user_id.to_string(), format!("{:04}-{:02}", month.year(), month.month()));
        Ok(*self.web_search_counts.lock().unwrap().get(&key).unwrap_or(&0))
    }

    async fn increment_daily_chat(&self, user_id: &str, day: DateTime<Utc>) -> RepoResult<()> {
        *self.daily_counts.lock().unwrap().entry((user_id.to_string(), day.date_naive())).or_insert(0) += 1;
        Ok(())
    }

    async fn increment_monthly_web_search(&self, user_id: &str, month: DateTime<Utc>) -> RepoResult<()> {
        let key = (user_id.to_string(), format!("{:04}-{:02}", month.year(), month.month()));
        *self.web_search_counts.lock().unwrap().entry(key).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> Summary {
        Summary {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            video_id: "abcdefghijk".to_string(),
            video_title: "Title".to_string(),
            summary_content: "Content".to_string(),
            transcript_context: "Transcript".to_string(),
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn in_memory_repo_round_trips_a_message() {
        let repo = InMemoryRepository::new();
        let s = summary();
        repo.seed_summary(s.clone());

        let fetched = repo.get_summary(s.id).await.unwrap();
        assert_eq!(fetched.video_title, "Title");

        repo.append_message(s.id, "user-1", ChatRole::User, "hi", false, false, &[], EnrichmentLevel::None)
            .await
            .unwrap();
        let history = repo.recent_messages(s.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);

        repo.increment_daily_chat("user-1", Utc::now()).await.unwrap();
        assert_eq!(repo.daily_chat_count("user-1", Utc::now()).await.unwrap(), 1);
    }
}
