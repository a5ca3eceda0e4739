//! Discovery orchestrator (§4.9): reformulate, search in parallel,
//! dedupe, detect language, score, diversify, and guarantee a trusted
//! pick.

mod reformulator;
mod scorer;
mod searcher;
mod trusted;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::warn;
use vclip_llm::{CompletionClient, ContentRatingClient};
use vclip_models::{DurationType, VideoCandidate};

use crate::cache::Cache;
use crate::config::CoreConfig;
use crate::error::DiscoveryError;

pub use reformulator::translate_query;

pub struct DiscoveryRequest {
    pub query: String,
    pub languages: Vec<String>,
    pub max_results: usize,
    pub min_quality: f32,
    pub duration_type: DurationType,
}

pub struct DiscoveryResult {
    pub candidates: Vec<VideoCandidate>,
    pub reformulated_queries: Vec<String>,
    pub total_searched: usize,
    pub languages_searched: Vec<String>,
    pub videos_per_language: HashMap<String, usize>,
    pub search_duration_ms: u64,
}

pub struct DiscoveryOrchestrator {
    config: CoreConfig,
    cache: Arc<dyn Cache>,
    completion_client: Option<Arc<dyn CompletionClient>>,
    rating_client: Option<Arc<dyn ContentRatingClient>>,
}

const STOPWORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "is", "of", "to", "in", "for", "with", "on"]),
    ("fr", &["le", "la", "et", "est", "de", "des", "pour", "avec", "les"]),
];

fn detect_language(text: &str, candidate_languages: &[String]) -> Option<String> {
    let lower = text.to_lowercase();
    let words: HashSet<&str> = lower.split_whitespace().collect();

    let mut best: Option<(String, usize)> = None;
    for lang in candidate_languages {
        let Some((_, stop)) = STOPWORDS.iter().find(|(code, _)| code == lang) else {
            continue;
        };
        let matches = stop.iter().filter(|w| words.contains(*w)).count();
        if matches >= 3 && best.as_ref().map(|(_, m)| matches > *m).unwrap_or(true) {
            best = Some((lang.clone(), matches));
        }
    }
    best.map(|(lang, _)| lang)
}

impl DiscoveryOrchestrator {
    pub fn new(
        config: CoreConfig,
        cache: Arc<dyn Cache>,
        completion_client: Option<Arc<dyn CompletionClient>>,
        rating_client: Option<Arc<dyn ContentRatingClient>>,
    ) -> Self {
        Self { config, cache, completion_client, rating_client }
    }

    pub async fn discover(&self, request: DiscoveryRequest) -> Result<DiscoveryResult, DiscoveryError> {
        let started = Instant::now();

        let languages = if request.languages.is_empty() {
            vec!["fr".to_string(), "en".to_string()]
        } else {
            request.languages.into_iter().take(6).collect::<Vec<_>>()
        };
        let max_results = request.max_results.clamp(1, 50);
        let primary_language = languages[0].clone();

        // Step 1: reformulate in the primary language.
        let model = self.config.llm_api_key.as_deref().map(|_| "gpt-4o-mini").unwrap_or("heuristic");
        let reformulated = reformulator::reformulate(
            self.completion_client.as_ref(),
            &request.query,
            &primary_language,
            model,
        )
        .await;

        // Step 2: build per-language search tasks.
        let mut tasks: Vec<(String, String)> = Vec::new();
        for (i, lang) in languages.iter().enumerate() {
            if i == 0 {
                for variant in reformulated.iter().take(2) {
                    tasks.push((variant.clone(), lang.clone()));
                }
            } else {
                let translated = reformulator::translate_query(
                    self.completion_client.as_ref(),
                    &request.query,
                    &primary_language,
                    lang,
                    model,
                )
                .await;
                tasks.push((translated, lang.clone()));
                for variant in reformulated.iter().take(2) {
                    tasks.push((variant.clone(), lang.clone()));
                }
            }
        }

        // Step 3: run searches concurrently under a semaphore.
        let semaphore = Arc::new(Semaphore::new(self.config.discovery_search_semaphore));
        let mut handles = Vec::new();
        for (query, lang) in tasks {
            let semaphore = semaphore.clone();
            let timeout = self.config.discovery_search_timeout;
            let per_language_cap = (max_results / languages.len().max(1)).max(5);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                tokio::time::timeout(timeout, searcher::search(&query, &lang, per_language_cap)).await
            }));
        }

        let mut raw_results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(Ok(results))) => raw_results.extend(results),
                Ok(Ok(Err(e))) => warn!(error = %e, "discovery search task failed"),
                Ok(Err(_)) => warn!("discovery search task timed out"),
                Err(e) => warn!(error = %e, "discovery search task panicked"),
            }
        }

        let total_searched = raw_results.len();

        // Step 4: dedupe by video_id.
        let mut seen = HashSet::new();
        raw_results.retain(|v| seen.insert(v.video_id.clone()));

        // Step 5: language detection.
        let mut videos_per_language: HashMap<String, usize> = HashMap::new();
        for video in &mut raw_results {
            let haystack = format!("{} {} {}", video.title, video.description.chars().take(500).collect::<String>(), video.channel);
            video.detected_language = detect_language(&haystack, &languages).or_else(|| Some("unknown".to_string()));
            *videos_per_language.entry(video.search_language.clone()).or_insert(0) += 1;
        }

        // Step 6: score in batch, filter, sort.
        let mut scored = scorer::score_batch(
            raw_results,
            &request.query,
            request.duration_type,
            self.cache.as_ref(),
            self.rating_client.clone(),
            self.config.discovery_quality_semaphore,
        )
        .await;
        scored.retain(|c| c.final_score >= request.min_quality);
        scored.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));

        // Step 7: diversify (max-per-channel, quota-per-language, two passes).
        let language_cap = (max_results / languages.len().max(1)).max(5);
        let diversified = diversify(scored, max_results.saturating_sub(1), language_cap);

        let mut final_candidates = diversified;

        // Step 8: trusted-pick guarantee.
        if trusted::needs_trusted_injection(&final_candidates, 5) {
            let existing_ids: Vec<String> = final_candidates.iter().map(|c| c.metadata.video_id.clone()).collect();
            if let Some(seed) = trusted::pick_seed(&existing_ids, &request.query) {
                trusted::splice_at_position_three(&mut final_candidates, seed);
            }
        }

        final_candidates.truncate(max_results);

        Ok(DiscoveryResult {
            candidates: final_candidates,
            reformulated_queries: reformulated,
            total_searched,
            languages_searched: languages,
            videos_per_language,
            search_duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Two-pass diversification: first pass enforces both the per-channel cap
/// (< 2) and the per-language cap; a second pass relaxes the language cap
/// but keeps the channel cap, filling up to `max`.
fn diversify(sorted: Vec<VideoCandidate>, max: usize, language_cap: usize) -> Vec<VideoCandidate> {
    let mut channel_counts: HashMap<String, usize> = HashMap::new();
    let mut language_counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    let mut leftovers = Vec::new();

    for candidate in sorted {
        if out.len() >= max {
            break;
        }
        let lang = candidate.detected_language.clone().unwrap_or_else(|| candidate.metadata.search_language.clone());
        let channel_count = *channel_counts.get(&candidate.metadata.channel_id).unwrap_or(&0);
        let lang_count = *language_counts.get(&lang).unwrap_or(&0);

        if channel_count < 2 && lang_count < language_cap {
            *channel_counts.entry(candidate.metadata.channel_id.clone()).or_insert(0) += 1;
            *language_counts.entry(lang).or_insert(0) += 1;
            out.push(candidate);
        } else {
            leftovers.push(candidate);
        }
    }

    for candidate in leftovers {
        if out.len() >= max {
            break;
        }
        let channel_count = *channel_counts.get(&candidate.metadata.channel_id).unwrap_or(&0);
        if channel_count < 2 {
            *channel_counts.entry(candidate.metadata.channel_id.clone()).or_insert(0) += 1;
            out.push(candidate);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english_by_stopwords() {
        let detected = detect_language(
            "the great documentary and the expert for the study",
            &["en".to_string(), "fr".to_string()],
        );
        assert_eq!(detected.as_deref(), Some("en"));
    }

    #[test]
    fn reports_none_below_minimum_matches() {
        let detected = detect_language("bonjour", &["en".to_string(), "fr".to_string()]);
        assert_eq!(detected, None);
    }
}
