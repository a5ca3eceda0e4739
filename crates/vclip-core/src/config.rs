//! Core engine configuration, assembled from the environment.
//!
//! Follows the teacher's `ApiConfig`/`WorkerConfig` idiom: a `from_env()`
//! associated function parsing with `.ok().and_then(...).unwrap_or(default)`,
//! a `Default` impl documenting the defaults, and `Duration`-typed timeouts.

use std::collections::HashMap;
use std::time::Duration;

use vclip_models::plan::default_plan_limits_table;
use vclip_models::{PlanLimits, PlanTier};

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// External cache backend URL (Redis). `None` selects the in-process cache.
    pub cache_url: Option<String>,

    pub invidious_instances: Vec<String>,
    pub piped_instances: Vec<String>,

    pub low_latency_whisper_key: Option<String>,
    pub general_whisper_key: Option<String>,
    pub streaming_transcription_key: Option<String>,
    pub async_poll_transcription_key: Option<String>,

    pub llm_api_key: Option<String>,
    pub llm_search_api_key: Option<String>,
    pub content_rating_api_key: Option<String>,

    pub circuit_failure_threshold: u32,
    pub circuit_recovery_timeout: Duration,
    pub instance_unhealthy_threshold: u32,
    pub instance_recheck_interval: Duration,
    pub outbound_rate_refill_per_second: u32,
    pub outbound_rate_capacity: u32,

    pub max_extraction_attempts: usize,
    pub phase1_timeout: Duration,
    pub phase2_timeout: Duration,
    pub phase3_download_timeout: Duration,
    pub phase3_transcribe_timeout: Duration,
    pub transcript_cache_ttl: Duration,

    pub discovery_search_semaphore: usize,
    pub discovery_quality_semaphore: usize,
    pub discovery_search_timeout: Duration,
    pub trusted_score_cache_ttl: Duration,

    pub llm_call_timeout: Duration,

    pub plan_limits: HashMap<PlanTier, PlanLimits>,

    /// Names/date-patterns the critical-fact-check detector matches
    /// against, loaded from configuration rather than compiled in, so the
    /// heuristic can be tuned without a rebuild (see DESIGN.md).
    pub fact_check_person_names: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cache_url: None,
            invidious_instances: vec![
                "https://invidious.io".into(),
                "https://yewtu.be".into(),
                "https://invidious.nerdvpn.de".into(),
            ],
            piped_instances: vec![
                "https://pipedapi.kavin.rocks".into(),
                "https://piped-api.lunar.icu".into(),
            ],
            low_latency_whisper_key: None,
            general_whisper_key: None,
            streaming_transcription_key: None,
            async_poll_transcription_key: None,
            llm_api_key: None,
            llm_search_api_key: None,
            content_rating_api_key: None,
            circuit_failure_threshold: 5,
            circuit_recovery_timeout: Duration::from_secs(300),
            instance_unhealthy_threshold: 3,
            instance_recheck_interval: Duration::from_secs(600),
            outbound_rate_refill_per_second: 2,
            outbound_rate_capacity: 10,
            max_extraction_attempts: 10,
            phase1_timeout: Duration::from_secs(30),
            phase2_timeout: Duration::from_secs(90),
            phase3_download_timeout: Duration::from_secs(240),
            phase3_transcribe_timeout: Duration::from_secs(330),
            transcript_cache_ttl: Duration::from_secs(24 * 3600),
            discovery_search_semaphore: 6,
            discovery_quality_semaphore: 10,
            discovery_search_timeout: Duration::from_secs(25),
            trusted_score_cache_ttl: Duration::from_secs(24 * 3600),
            llm_call_timeout: Duration::from_secs(60),
            plan_limits: default_plan_limits_table(),
            fact_check_person_names: vec![
                "president".into(),
                "prime minister".into(),
                "ceo".into(),
            ],
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_url: env_var("CACHE_URL"),
            invidious_instances: env_var("INVIDIOUS_INSTANCES")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.invidious_instances),
            piped_instances: env_var("PIPED_INSTANCES")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.piped_instances),
            low_latency_whisper_key: env_var("LOW_LATENCY_WHISPER_API_KEY"),
            general_whisper_key: env_var("GENERAL_WHISPER_API_KEY"),
            streaming_transcription_key: env_var("STREAMING_TRANSCRIPTION_API_KEY"),
            async_poll_transcription_key: env_var("ASYNC_POLL_TRANSCRIPTION_API_KEY"),
            llm_api_key: env_var("LLM_API_KEY"),
            llm_search_api_key: env_var("LLM_SEARCH_API_KEY"),
            content_rating_api_key: env_var("CONTENT_RATING_API_KEY"),
            circuit_failure_threshold: env_parsed("CIRCUIT_FAILURE_THRESHOLD", defaults.circuit_failure_threshold),
            circuit_recovery_timeout: Duration::from_secs(env_parsed(
                "CIRCUIT_RECOVERY_TIMEOUT_SECS",
                defaults.circuit_recovery_timeout.as_secs(),
            )),
            instance_unhealthy_threshold: env_parsed(
                "INSTANCE_UNHEALTHY_THRESHOLD",
                defaults.instance_unhealthy_threshold,
            ),
            instance_recheck_interval: Duration::from_secs(env_parsed(
                "INSTANCE_RECHECK_INTERVAL_SECS",
                defaults.instance_recheck_interval.as_secs(),
            )),
            outbound_rate_refill_per_second: env_parsed(
                "OUTBOUND_RATE_REFILL_PER_SECOND",
                defaults.outbound_rate_refill_per_second,
            ),
            outbound_rate_capacity: env_parsed("OUTBOUND_RATE_CAPACITY", defaults.outbound_rate_capacity),
            max_extraction_attempts: env_parsed("MAX_EXTRACTION_ATTEMPTS", defaults.max_extraction_attempts),
            phase1_timeout: Duration::from_secs(env_parsed("PHASE1_TIMEOUT_SECS", defaults.phase1_timeout.as_secs())),
            phase2_timeout: Duration::from_secs(env_parsed("PHASE2_TIMEOUT_SECS", defaults.phase2_timeout.as_secs())),
            phase3_download_timeout: Duration::from_secs(env_parsed(
                "PHASE3_DOWNLOAD_TIMEOUT_SECS",
                defaults.phase3_download_timeout.as_secs(),
            )),
            phase3_transcribe_timeout: Duration::from_secs(env_parsed(
                "PHASE3_TRANSCRIBE_TIMEOUT_SECS",
                defaults.phase3_transcribe_timeout.as_secs(),
            )),
            transcript_cache_ttl: Duration::from_secs(env_parsed(
                "TRANSCRIPT_CACHE_TTL_SECS",
                defaults.transcript_cache_ttl.as_secs(),
            )),
            discovery_search_semaphore: env_parsed(
                "DISCOVERY_SEARCH_SEMAPHORE",
                defaults.discovery_search_semaphore,
            ),
            discovery_quality_semaphore: env_parsed(
                "DISCOVERY_QUALITY_SEMAPHORE",
                defaults.discovery_quality_semaphore,
            ),
            discovery_search_timeout: Duration::from_secs(env_parsed(
                "DISCOVERY_SEARCH_TIMEOUT_SECS",
                defaults.discovery_search_timeout.as_secs(),
            )),
            trusted_score_cache_ttl: Duration::from_secs(env_parsed(
                "TRUSTED_SCORE_CACHE_TTL_SECS",
                defaults.trusted_score_cache_ttl.as_secs(),
            )),
            llm_call_timeout: Duration::from_secs(env_parsed("LLM_CALL_TIMEOUT_SECS", defaults.llm_call_timeout.as_secs())),
            plan_limits: defaults.plan_limits,
            fact_check_person_names: defaults.fact_check_person_names,
        }
    }
}
