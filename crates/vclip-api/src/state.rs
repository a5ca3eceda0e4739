//! Application state: wires the resilience primitives and the three
//! orchestrators from `vclip-core` to a persistence backend and the
//! optional LLM/transcription/search/rating clients from `vclip-llm`.

use std::sync::Arc;

use tracing::{info, warn};
use vclip_core::cache::InMemoryCache;
use vclip_core::{
    Cache, ChatService, CircuitBreakerRegistry, CoreConfig, DiscoveryOrchestrator, HealthMonitor,
    InstanceHealthRegistry, TokenBucket, TranscriptExtractor,
};
use vclip_llm::{
    AsyncPollTranscriptionProvider, CompletionClient, ContentRatingClient, GeneralWhisperProvider,
    HttpCompletionClient, HttpContentRatingClient, HttpSearchClient, LowLatencyWhisperProvider,
    SearchAugmentedClient, StreamingTranscriptionProvider, TranscriptionProvider,
};

use crate::auth::JwksCache;
use crate::config::ApiConfig;
use crate::repo::{InMemoryRepository, PgRepository};

const TRANSCRIPTION_BASE_URL: &str = "https://api.vclip-transcription.example";
const LLM_BASE_URL: &str = "https://api.openai.com/v1";
const CONTENT_RATING_BASE_URL: &str = "https://api.content-rating.example";
const PREMIUM_MODEL: &str = "gpt-4-class";

/// Shared application state, cheap to clone (everything behind an `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jwks: Arc<JwksCache>,
    pub cache: Arc<dyn Cache>,
    pub transcript_extractor: Arc<TranscriptExtractor>,
    pub discovery: Arc<DiscoveryOrchestrator>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub async fn new(config: ApiConfig, core_config: CoreConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let cache: Arc<dyn Cache> = InMemoryCache::new(50_000);

        let circuit_breakers =
            CircuitBreakerRegistry::new(core_config.circuit_failure_threshold, core_config.circuit_recovery_timeout);
        let instance_health = InstanceHealthRegistry::new(
            core_config.instance_unhealthy_threshold,
            core_config.instance_recheck_interval,
        );
        let rate_limiter =
            TokenBucket::new(core_config.outbound_rate_refill_per_second, core_config.outbound_rate_capacity);
        let health_monitor = HealthMonitor::new();

        let transcription_providers = build_transcription_providers(&core_config);

        let transcript_extractor = Arc::new(TranscriptExtractor::new(
            core_config.clone(),
            Arc::clone(&cache),
            circuit_breakers,
            instance_health,
            rate_limiter,
            health_monitor,
            transcription_providers,
        ));

        let completion_client: Arc<dyn CompletionClient> =
            Arc::new(HttpCompletionClient::new(core_config.llm_api_key.clone(), LLM_BASE_URL));
        let search_client: Option<Arc<dyn SearchAugmentedClient>> = core_config
            .llm_search_api_key
            .clone()
            .map(|key| Arc::new(HttpSearchClient::new(Some(key), LLM_BASE_URL, PREMIUM_MODEL)) as Arc<dyn SearchAugmentedClient>);
        let rating_client: Option<Arc<dyn ContentRatingClient>> = core_config
            .content_rating_api_key
            .clone()
            .map(|key| Arc::new(HttpContentRatingClient::new(Some(key), CONTENT_RATING_BASE_URL)) as Arc<dyn ContentRatingClient>);

        let discovery = Arc::new(DiscoveryOrchestrator::new(
            core_config.clone(),
            Arc::clone(&cache),
            core_config.llm_api_key.as_ref().map(|_| completion_client.clone()),
            rating_client,
        ));

        let (summaries, messages, quotas) = build_repositories().await?;
        let chat =
            Arc::new(ChatService::new(core_config, summaries, messages, quotas, completion_client, search_client));

        let jwks = Arc::new(JwksCache::new().await?);

        Ok(Self { config, jwks, cache, transcript_extractor, discovery, chat })
    }
}

fn build_transcription_providers(config: &CoreConfig) -> Vec<Arc<dyn TranscriptionProvider>> {
    vec![
        Arc::new(LowLatencyWhisperProvider::new(config.low_latency_whisper_key.clone(), TRANSCRIPTION_BASE_URL)),
        Arc::new(GeneralWhisperProvider::new(config.general_whisper_key.clone(), TRANSCRIPTION_BASE_URL)),
        Arc::new(StreamingTranscriptionProvider::new(
            config.streaming_transcription_key.clone(),
            TRANSCRIPTION_BASE_URL,
        )),
        Arc::new(AsyncPollTranscriptionProvider::new(
            config.async_poll_transcription_key.clone(),
            TRANSCRIPTION_BASE_URL,
        )),
    ]
}

type Repositories = (
    Arc<dyn vclip_core::repository::SummaryRepository>,
    Arc<dyn vclip_core::repository::ChatRepository>,
    Arc<dyn vclip_core::repository::QuotaRepository>,
);

/// `DATABASE_URL` selects Postgres; its absence falls back to an in-process
/// repository so the server still boots for local development.
async fn build_repositories() -> Result<Repositories, Box<dyn std::error::Error>> {
    match std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()) {
        Some(url) => {
            info!("connecting to Postgres for summary/chat/quota persistence");
            let repo = Arc::new(PgRepository::connect(&url).await?);
            Ok((repo.clone(), repo.clone(), repo))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory repository (not durable across restarts)");
            let repo = Arc::new(InMemoryRepository::new());
            Ok((repo.clone(), repo.clone(), repo))
        }
    }
}
