//! Chat service (§4.12): the 6-step quota-gated, enrichment-aware chat
//! turn orchestrator.

pub mod enrichment;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;
use vclip_llm::{CompletionClient, SearchAugmentedClient};
use vclip_models::{ChatMessage, ChatRole, PlanLimits, PlanTier, QuotaStatus};

use crate::config::CoreConfig;
use crate::error::ChatError;
use crate::repository::{ChatRepository, QuotaRepository, RepositoryError, SummaryRepository};
use enrichment::{EnrichmentRequest, EnrichmentOutput};

pub struct ChatTurnRequest {
    pub user_id: String,
    pub summary_id: Uuid,
    pub question: String,
    pub plan: PlanTier,
    pub web_search_requested: bool,
}

pub struct ChatTurnResponse {
    pub message: ChatMessage,
    pub quota: QuotaStatus,
}

pub struct ChatService {
    config: CoreConfig,
    summaries: Arc<dyn SummaryRepository>,
    messages: Arc<dyn ChatRepository>,
    quotas: Arc<dyn QuotaRepository>,
    completion_client: Arc<dyn CompletionClient>,
    search_client: Option<Arc<dyn SearchAugmentedClient>>,
    /// Per-user locks serializing the quota check-then-increment gate, so
    /// two concurrent turns from the same user can't both pass the check
    /// before either increments (§4.12 step 1).
    user_locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ChatService {
    pub fn new(
        config: CoreConfig,
        summaries: Arc<dyn SummaryRepository>,
        messages: Arc<dyn ChatRepository>,
        quotas: Arc<dyn QuotaRepository>,
        completion_client: Arc<dyn CompletionClient>,
        search_client: Option<Arc<dyn SearchAugmentedClient>>,
    ) -> Self {
        Self {
            config,
            summaries,
            messages,
            quotas,
            completion_client,
            search_client,
            user_locks: AsyncMutex::new(HashMap::new()),
        }
    }

    async fn lock_for_user(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(user_id.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Runs one chat turn: quota check, ownership check, context load,
    /// enrichment, persistence, quota increment.
    pub async fn ask(&self, request: ChatTurnRequest) -> Result<ChatTurnResponse, ChatError> {
        let user_lock = self.lock_for_user(&request.user_id).await;
        let _guard = user_lock.lock().await;

        let limits = self
            .config
            .plan_limits
            .get(&request.plan)
            .cloned()
            .unwrap_or_else(|| PlanLimits::for_tier(request.plan));

        let now = chrono::Utc::now();

        // Step 1: quota check (daily + per-video), held under `_guard` so
        // no concurrent turn from this user can read stale counts between
        // this check and the increment in step 6.
        let daily_used = self
            .quotas
            .daily_chat_count(&request.user_id, now)
            .await
            .map_err(persistence_err)?;
        if !PlanLimits::allows(limits.chat_daily_limit, daily_used) {
            return Err(ChatError::DailyLimitReached { used: daily_used, limit: limits.chat_daily_limit });
        }

        let video_used = self
            .quotas
            .video_chat_count(&request.user_id, request.summary_id)
            .await
            .map_err(persistence_err)?;
        if !PlanLimits::allows(limits.chat_per_video_limit, video_used) {
            return Err(ChatError::VideoLimitReached { used: video_used, limit: limits.chat_per_video_limit });
        }

        // Step 2: load the summary and verify ownership.
        let summary = self.summaries.get_summary(request.summary_id).await.map_err(|e| match e {
            RepositoryError::NotFound => ChatError::SummaryNotFound,
            RepositoryError::Storage(msg) => ChatError::Persistence(msg),
        })?;
        if summary.user_id != request.user_id {
            return Err(ChatError::PermissionDenied);
        }

        // Step 3: load recent context (last 10 messages).
        let history = self
            .messages
            .recent_messages(request.summary_id, 10)
            .await
            .map_err(persistence_err)?;

        // Web search is only honored when the plan allows it and the
        // monthly quota hasn't been exhausted.
        let web_search_requested = request.web_search_requested
            && limits.web_search_enabled
            && {
                let used = self
                    .quotas
                    .monthly_web_search_count(&request.user_id, now)
                    .await
                    .map_err(persistence_err)?;
                PlanLimits::allows(limits.web_search_monthly, used)
            };

        // Step 4: invoke enrichment.
        let EnrichmentOutput { response, web_search_used, fact_checked, sources, enrichment_level } =
            enrichment::run(
                &self.completion_client,
                self.search_client.as_ref(),
                EnrichmentRequest {
                    question: &request.question,
                    video_title: &summary.video_title,
                    video_summary: &summary.summary_content,
                    transcript: &summary.transcript_context,
                    history: &history,
                    user_plan: request.plan,
                    user_requested_web_search: web_search_requested,
                    default_model: &limits.default_model,
                    premium_model: "gpt-4-class",
                    fact_check_person_names: &self.config.fact_check_person_names,
                },
            )
            .await?;

        // Step 5: persist the user question and the assistant reply.
        self.messages
            .append_message(
                request.summary_id,
                &request.user_id,
                ChatRole::User,
                &request.question,
                false,
                false,
                &[],
                enrichment_level,
            )
            .await
            .map_err(persistence_err)?;

        let assistant_message = self
            .messages
            .append_message(
                request.summary_id,
                &request.user_id,
                ChatRole::Assistant,
                &response,
                web_search_used,
                fact_checked,
                &sources,
                enrichment_level,
            )
            .await
            .map_err(persistence_err)?;

        // Step 6: increment counters.
        self.quotas.increment_daily_chat(&request.user_id, now).await.map_err(persistence_err)?;
        if web_search_used {
            self.quotas.increment_monthly_web_search(&request.user_id, now).await.map_err(persistence_err)?;
        }

        let quota = QuotaStatus {
            daily_chat_count: daily_used + 1,
            daily_chat_limit: limits.chat_daily_limit,
            video_chat_count: video_used + 1,
            video_chat_limit: limits.chat_per_video_limit,
            monthly_web_search_count: if web_search_used { 1 } else { 0 },
            monthly_web_search_limit: limits.web_search_monthly,
        };

        Ok(ChatTurnResponse { message: assistant_message, quota })
    }
}

impl ChatService {
    /// Ordered chat history for a summary, most recent `limit` turns.
    pub async fn history(&self, summary_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>, ChatError> {
        self.messages.recent_messages(summary_id, limit).await.map_err(persistence_err)
    }

    /// Current usage against a user's plan-derived quotas for a summary.
    pub async fn quota_status(
        &self,
        user_id: &str,
        summary_id: Uuid,
        plan: PlanTier,
    ) -> Result<QuotaStatus, ChatError> {
        let limits = self.config.plan_limits.get(&plan).cloned().unwrap_or_else(|| PlanLimits::for_tier(plan));
        let now = chrono::Utc::now();

        let daily_chat_count = self.quotas.daily_chat_count(user_id, now).await.map_err(persistence_err)?;
        let video_chat_count = self.quotas.video_chat_count(user_id, summary_id).await.map_err(persistence_err)?;
        let monthly_web_search_count =
            self.quotas.monthly_web_search_count(user_id, now).await.map_err(persistence_err)?;

        Ok(QuotaStatus {
            daily_chat_count,
            daily_chat_limit: limits.chat_daily_limit,
            video_chat_count,
            video_chat_limit: limits.chat_per_video_limit,
            monthly_web_search_count,
            monthly_web_search_limit: limits.web_search_monthly,
        })
    }
}

fn persistence_err(e: RepositoryError) -> ChatError {
    match e {
        RepositoryError::NotFound => ChatError::SummaryNotFound,
        RepositoryError::Storage(msg) => ChatError::Persistence(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use vclip_llm::completion::CompletionRequest;
    use vclip_llm::LlmError;
    use vclip_models::{EnrichmentLevel, Summary};

    struct FixedSummary(Summary);

    #[async_trait]
    impl SummaryRepository for FixedSummary {
        async fn get_summary(&self, _summary_id: Uuid) -> crate::repository::RepoResult<Summary> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct InMemoryMessages(Mutex<Vec<ChatMessage>>);

    #[async_trait]
    impl ChatRepository for InMemoryMessages {
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
        ) -> crate::repository::RepoResult<ChatMessage> {
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
            self.0.lock().unwrap().push(message.clone());
            Ok(message)
        }

        async fn recent_messages(&self, _summary_id: Uuid, limit: usize) -> crate::repository::RepoResult<Vec<ChatMessage>> {
            let guard = self.0.lock().unwrap();
            Ok(guard.iter().rev().take(limit).rev().cloned().collect())
        }
    }

    #[derive(Default)]
    struct NoUsageQuotas;

    #[async_trait]
    impl QuotaRepository for NoUsageQuotas {
        async fn daily_chat_count(&self, _user_id: &str, _day: DateTime<Utc>) -> crate::repository::RepoResult<i64> {
            Ok(0)
        }
        async fn video_chat_count(&self, _user_id: &str, _summary_id: Uuid) -> crate::repository::RepoResult<i64> {
            Ok(0)
        }
        async fn monthly_web_search_count(&self, _user_id: &str, _month: DateTime<Utc>) -> crate::repository::RepoResult<i64> {
            Ok(0)
        }
        async fn increment_daily_chat(&self, _user_id: &str, _day: DateTime<Utc>) -> crate::repository::RepoResult<()> {
            Ok(())
        }
        async fn increment_monthly_web_search(&self, _user_id: &str, _month: DateTime<Utc>) -> crate::repository::RepoResult<()> {
            Ok(())
        }
    }

    struct EchoCompletion;

    #[async_trait]
    impl CompletionClient for EchoCompletion {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            Ok("This video covers several key points.".to_string())
        }
    }

    fn summary() -> Summary {
        Summary {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            video_id: "abcdefghijk".to_string(),
            video_title: "A Talk About Rust".to_string(),
            summary_content: "An overview of ownership and borrowing.".to_string(),
            transcript_context: "Today we will talk about ownership in Rust...".to_string(),
            language: "en".to_string(),
        }
    }

    fn service(plan_summary: Summary) -> ChatService {
        ChatService::new(
            CoreConfig::default(),
            Arc::new(FixedSummary(plan_summary)),
            Arc::new(InMemoryMessages::default()),
            Arc::new(NoUsageQuotas),
            Arc::new(EchoCompletion),
            None,
        )
    }

    #[tokio::test]
    async fn happy_path_returns_assistant_message_and_quota() {
        let s = summary();
        let summary_id = s.id;
        let svc = service(s);
        let response = svc
            .ask(ChatTurnRequest {
                user_id: "user-1".to_string(),
                summary_id,
                question: "What is this video about?".to_string(),
                plan: PlanTier::Free,
                web_search_requested: false,
            })
            .await
            .unwrap();
        assert_eq!(response.message.role, ChatRole::Assistant);
        assert_eq!(response.quota.daily_chat_count, 1);
    }

    #[tokio::test]
    async fn rejects_questions_from_non_owners() {
        let s = summary();
        let summary_id = s.id;
        let svc = service(s);
        let err = svc
            .ask(ChatTurnRequest {
                user_id: "someone-else".to_string(),
                summary_id,
                question: "What is this video about?".to_string(),
                plan: PlanTier::Free,
                web_search_requested: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::PermissionDenied));
    }

    #[tokio::test]
    async fn free_plan_critical_question_gets_disclaimer_not_search() {
        let s = summary();
        let summary_id = s.id;
        let svc = service(s);
        let response = svc
            .ask(ChatTurnRequest {
                user_id: "user-1".to_string(),
                summary_id,
                question: "who was elected president in 2024?".to_string(),
                plan: PlanTier::Free,
                web_search_requested: false,
            })
            .await
            .unwrap();
        assert!(!response.message.web_search_used);
        assert!(response.message.content.contains("Upgrade"));
    }
}
