//! The transcript extractor: three-phase method cascade with caching,
//! circuit breaking, instance health, rate limiting, and health-monitor
//! priority ordering wired around the phase implementations.

mod parse;
mod phase1;
mod phase2;
mod phase3;
mod types;

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{info, warn};
use vclip_llm::TranscriptionProvider;
use vclip_models::{extract_youtube_id_legacy, ExtractionMethod, Segment, TranscriptResult};

use crate::cache::{get_json, set_json, Cache};
use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::config::CoreConfig;
use crate::error::{MethodError, TranscriptError};
use crate::health_monitor::HealthMonitor;
use crate::instance_health::InstanceHealthRegistry;
use crate::rate_limiter::TokenBucket;
use crate::transcript::types::MethodOutcome;

pub use types::select_track;

pub struct TranscriptExtractor {
    config: CoreConfig,
    cache: Arc<dyn Cache>,
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    instance_health: Arc<InstanceHealthRegistry>,
    rate_limiter: Arc<TokenBucket>,
    health_monitor: Arc<HealthMonitor>,
    http: reqwest::Client,
    transcription_providers: Vec<Arc<dyn TranscriptionProvider>>,
}

impl TranscriptExtractor {
    pub fn new(
        config: CoreConfig,
        cache: Arc<dyn Cache>,
        circuit_breakers: Arc<CircuitBreakerRegistry>,
        instance_health: Arc<InstanceHealthRegistry>,
        rate_limiter: Arc<TokenBucket>,
        health_monitor: Arc<HealthMonitor>,
        transcription_providers: Vec<Arc<dyn TranscriptionProvider>>,
    ) -> Self {
        Self {
            config,
            cache,
            circuit_breakers,
            instance_health,
            rate_limiter,
            health_monitor,
            http: reqwest::Client::new(),
            transcription_providers,
        }
    }

    fn resolve_video_id(&self, video_url_or_id: &str) -> Result<String, TranscriptError> {
        let trimmed = video_url_or_id.trim();
        let bare_id_re = regex::Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
        if bare_id_re.is_match(trimmed) {
            return Ok(trimmed.to_string());
        }
        extract_youtube_id_legacy(trimmed).ok_or_else(|| TranscriptError::InvalidInput(video_url_or_id.to_string()))
    }

    async fn run_phase1(&self, video_id: &str, preferred_languages: &[String]) -> Result<(ExtractionMethod, MethodOutcome), Vec<MethodError>> {
        let mut set: JoinSet<(ExtractionMethod, Result<MethodOutcome, MethodError>)> = JoinSet::new();

        let mut errors = Vec::new();

        for method in ExtractionMethod::PHASE1 {
            if !self.circuit_breakers.can_execute(method.as_str()).await {
                errors.push(MethodError::new(method.as_str(), "circuit open"));
                continue;
            }
            self.rate_limiter.acquire().await;

            let http = self.http.clone();
            let video_id = video_id.to_string();
            let langs = preferred_languages.to_vec();
            let invidious_instances = self.config.invidious_instances.clone();
            let piped_instances = self.config.piped_instances.clone();
            let instance_health = self.instance_health.clone();

            set.spawn(async move {
                let outcome = match method {
                    ExtractionMethod::CaptionApi => phase1::caption_api(&http, &video_id, &langs).await,
                    ExtractionMethod::InnertubeClient => phase1::innertube_client(&http, &video_id, &langs).await,
                    ExtractionMethod::WatchPageScrape => phase1::watch_page_scrape(&http, &video_id, &langs).await,
                    ExtractionMethod::Invidious => {
                        phase1::invidious(&http, &video_id, &langs, &invidious_instances, &instance_health).await
                    }
                    ExtractionMethod::Piped => {
                        phase1::piped(&http, &video_id, &langs, &piped_instances, &instance_health).await
                    }
                    other => unreachable!("{other} is not a phase-1 method"),
                };
                (method, outcome)
            });
        }

        if set.is_empty() {
            return Err(errors);
        }

        let deadline = tokio::time::sleep(self.config.phase1_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = set.join_next() => {
                    match joined {
                        Some(Ok((method, Ok(outcome)))) => {
                            self.circuit_breakers.record_success(method.as_str()).await;
                            self.health_monitor.record_attempt(method.as_str(), true, 0, None).await;
                            set.abort_all();
                            return Ok((method, outcome));
                        }
                        Some(Ok((method, Err(err)))) => {
                            self.circuit_breakers.record_failure(method.as_str()).await;
                            self.health_monitor.record_attempt(method.as_str(), false, 0, Some(&err.message)).await;
                            errors.push(err);
                        }
                        Some(Err(join_err)) => {
                            warn!(error = %join_err, "phase 1 task panicked or was cancelled");
                        }
                        None => return Err(errors),
                    }
                }
                _ = &mut deadline => {
                    set.abort_all();
                    errors.push(MethodError::new("phase1", "phase 1 timed out"));
                    return Err(errors);
                }
            }
        }
    }

    async fn run_phase2(&self, video_url: &str, preferred_languages: &[String]) -> Result<(ExtractionMethod, MethodOutcome), Vec<MethodError>> {
        let mut errors = Vec::new();
        for method in ExtractionMethod::PHASE2 {
            let video_url = video_url.to_string();
            let langs = preferred_languages.to_vec();
            let result = tokio::time::timeout(self.config.phase2_timeout, async move {
                match method {
                    ExtractionMethod::YtDlpManualSubs => phase2::yt_dlp_manual_subs(&video_url, &langs).await,
                    ExtractionMethod::YtDlpAutoSubs => phase2::yt_dlp_auto_subs(&video_url, &langs).await,
                    other => unreachable!("{other} is not a phase-2 method"),
                }
            })
            .await;

            match result {
                Ok(Ok(outcome)) => {
                    self.health_monitor.record_attempt(method.as_str(), true, 0, None).await;
                    return Ok((method, outcome));
                }
                Ok(Err(err)) => {
                    self.health_monitor.record_attempt(method.as_str(), false, 0, Some(&err.message)).await;
                    errors.push(err);
                }
                Err(_) => {
                    let err = MethodError::new(method.as_str(), "timed out");
                    self.health_monitor.record_attempt(method.as_str(), false, 0, Some(&err.message)).await;
                    errors.push(err);
                }
            }
        }
        Err(errors)
    }

    async fn run_phase3(&self, video_url: &str) -> Result<(ExtractionMethod, MethodOutcome), Vec<MethodError>> {
        let mut errors = Vec::new();

        let audio = match tokio::time::timeout(self.config.phase3_download_timeout, phase3::download_audio(video_url)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                errors.push(MethodError::new("audio_download", e));
                return Err(errors);
            }
            Err(_) => {
                errors.push(MethodError::new("audio_download", "timed out"));
                return Err(errors);
            }
        };

        let mut available = Vec::with_capacity(self.transcription_providers.len());
        for provider in &self.transcription_providers {
            if self.circuit_breakers.can_execute(provider.name()).await {
                available.push(provider.clone());
            } else {
                errors.push(MethodError::new(provider.name(), "circuit open"));
            }
        }

        let result = tokio::time::timeout(
            self.config.phase3_transcribe_timeout,
            phase3::transcribe_with_providers(&available, audio, None),
        )
        .await;

        match result {
            Ok(Ok((provider_name, outcome))) => {
                // Attribute the success to whichever provider actually answered.
                let method = ExtractionMethod::PHASE3
                    .into_iter()
                    .find(|m| m.as_str() == provider_name)
                    .unwrap_or(ExtractionMethod::LowLatencyWhisper);
                self.circuit_breakers.record_success(method.as_str()).await;
                self.health_monitor.record_attempt(method.as_str(), true, 0, None).await;
                Ok((method, outcome))
            }
            Ok(Err(err)) => {
                for provider in &available {
                    self.circuit_breakers.record_failure(provider.name()).await;
                }
                self.health_monitor.record_attempt("audio_transcription", false, 0, Some(&err.message)).await;
                errors.push(err);
                Err(errors)
            }
            Err(_) => {
                let err = MethodError::new("audio_transcription", "timed out");
                for provider in &available {
                    self.circuit_breakers.record_failure(provider.name()).await;
                }
                self.health_monitor.record_attempt("audio_transcription", false, 0, Some(&err.message)).await;
                errors.push(err);
                Err(errors)
            }
        }
    }

    /// Run the full three-phase cascade, consulting and populating the
    /// cache, and returning an aggregated error on total exhaustion.
    pub async fn extract(
        &self,
        video_url_or_id: &str,
        preferred_languages: &[String],
    ) -> Result<TranscriptResult, TranscriptError> {
        let started = Instant::now();
        let video_id = self.resolve_video_id(video_url_or_id)?;
        let preferred_languages: Vec<String> = if preferred_languages.is_empty() {
            vec!["en".to_string(), "fr".to_string()]
        } else {
            preferred_languages.to_vec()
        };

        let cache_key = format!("transcript:{video_id}");
        if let Some(cached) = get_json::<TranscriptResult>(self.cache.as_ref(), &cache_key).await {
            info!(video_id = video_id.as_str(), "transcript cache hit");
            return Ok(cached);
        }

        let video_url = format!("https://www.youtube.com/watch?v={video_id}");
        let mut all_errors: Vec<MethodError> = Vec::new();

        let found = match self.run_phase1(&video_id, &preferred_languages).await {
            Ok(found) => Some(found),
            Err(errors) => {
                all_errors.extend(errors);
                match self.run_phase2(&video_url, &preferred_languages).await {
                    Ok(found) => Some(found),
                    Err(errors) => {
                        all_errors.extend(errors);
                        match self.run_phase3(&video_url).await {
                            Ok(found) => Some(found),
                            Err(errors) => {
                                all_errors.extend(errors);
                                None
                            }
                        }
                    }
                }
            }
        };

        let Some((method, outcome)) = found else {
            return Err(TranscriptError::Exhausted {
                attempts: self.config.max_extraction_attempts,
                errors: all_errors,
            });
        };

        let result = assemble_result(method, outcome, started.elapsed().as_millis() as u64);
        set_json(self.cache.as_ref(), &cache_key, &result, self.config.transcript_cache_ttl).await;

        Ok(result)
    }
}

fn assemble_result(method: ExtractionMethod, outcome: MethodOutcome, extraction_time_ms: u64) -> TranscriptResult {
    let text = parse::join_text(&outcome.segments);
    let text_timestamped = parse::render_timestamped(&outcome.segments);
    TranscriptResult {
        text,
        text_timestamped,
        language: outcome.language,
        method,
        is_auto_generated: outcome.is_auto_generated,
        confidence: method.base_confidence(),
        segments: Some(outcome.segments),
        extraction_time_ms,
    }
}

/// Re-render a stored transcript's timestamped view; used by callers that
/// only persisted `segments` and need `text_timestamped` regenerated.
pub fn render_timestamped(segments: &[Segment]) -> String {
    parse::render_timestamped(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    fn extractor() -> TranscriptExtractor {
        TranscriptExtractor::new(
            CoreConfig::default(),
            InMemoryCache::new(16),
            CircuitBreakerRegistry::with_defaults(),
            InstanceHealthRegistry::with_defaults(),
            TokenBucket::with_defaults(),
            HealthMonitor::new(),
            Vec::new(),
        )
    }

    #[test]
    fn resolves_bare_id() {
        let extractor = extractor();
        assert_eq!(extractor.resolve_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
    }

    #[test]
    fn resolves_full_url() {
        let extractor = extractor();
        assert_eq!(
            extractor.resolve_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn rejects_invalid_input() {
        let extractor = extractor();
        assert!(extractor.resolve_video_id("not a video").is_err());
    }
}
