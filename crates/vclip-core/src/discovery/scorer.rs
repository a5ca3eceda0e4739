//! Quality scorer (§4.7): six scoring axes plus a clickbait penalty,
//! batched over a candidate list with a concurrency-limited external
//! quality lookup.

use std::sync::Arc;

use regex::Regex;
use tokio::sync::Semaphore;
use vclip_llm::ContentRatingClient;
use vclip_models::{DurationType, VideoCandidate, VideoMetadata};

use crate::cache::{get_json, set_json, Cache};

const SYNONYM_GROUPS: &[&[&str]] = &[
    &["covid", "coronavirus", "pandemic"],
    &["ia", "ai", "machine learning"],
    &["voiture", "car", "automobile"],
    &["sante", "health", "medecine", "medicine"],
];

fn synonyms_of(token: &str) -> Vec<&'static str> {
    SYNONYM_GROUPS
        .iter()
        .find(|group| group.contains(&token))
        .map(|group| group.to_vec())
        .unwrap_or_default()
}

fn academic_patterns() -> Vec<Regex> {
    [
        r"(?i)\bsource\b",
        r"(?i)\b(study|etude|étude)\b",
        r"(?i)\bexpert\b",
        r"(?i)\bprofess(or|eur)\b",
        r"(?i)\bdocumentar(y|ies|ie)\b",
        r"(?i)peer[- ]reviewed",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
}

fn clickbait_patterns() -> Vec<Regex> {
    [
        r"\b[A-Z]{10,}\b",
        r"(!{2,}|\?{2,})",
        r"(?i)you won'?t believe",
        r"(?i)\bshocking\b",
        r"\$\d{4,}",
        r"(?i)#\d+\s+(will|va)\b",
        r"(?i)^\s*\[breaking\]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
}

/// Relevance (§4.7): weighted token match across title/description/channel,
/// synonym-aware, with a title-coverage bonus.
fn score_relevance(query: &str, metadata: &VideoMetadata) -> (f32, Vec<String>) {
    let tokens: Vec<&str> = query.split_whitespace().filter(|t| t.len() >= 2).collect();
    if tokens.is_empty() {
        return (0.0, Vec::new());
    }

    let title_lower = metadata.title.to_lowercase();
    let description_prefix: String = metadata.description.chars().take(500).collect::<String>().to_lowercase();
    let channel_lower = metadata.channel.to_lowercase();

    let mut total_weight = 0.0f32;
    let mut matched_weight = 0.0f32;
    let mut matched_terms = Vec::new();
    let mut title_token_hits = 0usize;

    for token in &tokens {
        let lower = token.to_lowercase();
        let weight = lower.len() as f32 / 10.0;
        total_weight += weight;

        let candidates: Vec<String> = std::iter::once(lower.clone())
            .chain(synonyms_of(&lower).into_iter().map(str::to_string))
            .collect();

        let title_hit = candidates.iter().any(|c| title_lower.contains(c.as_str()));
        let description_hit = candidates.iter().any(|c| description_prefix.contains(c.as_str()));
        let channel_hit = candidates.iter().any(|c| channel_lower.contains(c.as_str()));

        if title_hit {
            matched_weight += weight * 1.0;
            title_token_hits += 1;
            matched_terms.push(token.to_string());
        } else if description_hit {
            matched_weight += weight * 0.5;
            matched_terms.push(token.to_string());
        } else if channel_hit {
            matched_weight += weight * 0.3;
            matched_terms.push(token.to_string());
        }
    }

    let mut score = if total_weight > 0.0 { matched_weight / total_weight } else { 0.0 };
    if title_token_hits == tokens.len() {
        score = (score + 0.3).min(1.0);
    }

    (score.clamp(0.0, 1.0), matched_terms)
}

fn score_academic(metadata: &VideoMetadata, patterns: &[Regex]) -> (f32, u8) {
    let haystack = format!("{} {} {}", metadata.title, metadata.description, metadata.channel);
    let hits = patterns.iter().filter(|p| p.is_match(&haystack)).count() as u8;
    ((hits as f32 * 0.2).min(1.0), hits)
}

fn score_engagement(metadata: &VideoMetadata) -> f32 {
    if metadata.view_count == 0 {
        return 0.0;
    }
    let view_score = ((metadata.view_count as f64 + 1.0).log10() / 7.0).min(1.0) as f32;
    if metadata.like_count > 0 {
        let like_ratio = ((metadata.like_count as f64 / metadata.view_count as f64) * 20.0).min(1.0) as f32;
        (view_score + like_ratio) / 2.0
    } else {
        view_score
    }
}

fn score_freshness(metadata: &VideoMetadata) -> f32 {
    let age_days = (chrono::Utc::now() - metadata.upload_date).num_days();
    match age_days {
        d if d <= 7 => 1.0,
        d if d <= 30 => 0.9,
        d if d <= 90 => 0.7,
        d if d <= 365 => 0.5,
        d if d <= 730 => 0.3,
        _ => 0.1,
    }
}

fn score_duration_fit(metadata: &VideoMetadata, duration_type: DurationType) -> f32 {
    let (min, max) = duration_type.optimal_range();
    let duration = metadata.duration_seconds;
    if duration < min {
        (duration / min) as f32
    } else if duration > max {
        (1.0 - (duration - max) / max).max(0.0) as f32
    } else {
        1.0
    }
}

fn score_clickbait(metadata: &VideoMetadata, patterns: &[Regex]) -> f32 {
    let hits = patterns.iter().filter(|p| p.is_match(&metadata.title)).count();
    (hits as f32 * 0.15).min(1.0)
}

async fn external_quality(
    cache: &dyn Cache,
    rating_client: Option<&dyn ContentRatingClient>,
    semaphore: &Semaphore,
    video_id: &str,
) -> f32 {
    let key = format!("trusted_score:{video_id}");
    if let Some(cached) = get_json::<f32>(cache, &key).await {
        return cached;
    }

    let Some(client) = rating_client else {
        return 0.5;
    };

    let _permit = semaphore.acquire().await;
    let normalized = match client.rate(video_id).await {
        Ok(raw) if raw != 0.0 => (((raw + 100.0) / 200.0) as f32).clamp(0.0, 1.0),
        _ => 0.5,
    };

    set_json(cache, &key, &normalized, std::time::Duration::from_secs(24 * 3600)).await;
    normalized
}

/// Score a batch of candidates for `query`, writing `trusted_score:*`
/// cache entries as a side effect.
pub async fn score_batch(
    candidates: Vec<VideoMetadata>,
    query: &str,
    duration_type: DurationType,
    cache: &dyn Cache,
    rating_client: Option<Arc<dyn ContentRatingClient>>,
    quality_concurrency: usize,
) -> Vec<VideoCandidate> {
    let semaphore = Semaphore::new(quality_concurrency.max(1));
    let academic = academic_patterns();
    let clickbait = clickbait_patterns();

    let mut scored = Vec::with_capacity(candidates.len());
    for metadata in candidates {
        let (relevance, matched_terms) = score_relevance(query, &metadata);
        let (academic_score, sources) = score_academic(&metadata, &academic);
        let engagement = score_engagement(&metadata);
        let freshness = score_freshness(&metadata);
        let duration_fit = score_duration_fit(&metadata, duration_type);
        let clickbait_penalty = score_clickbait(&metadata, &clickbait);
        let ext_quality = external_quality(cache, rating_client.as_deref(), &semaphore, &metadata.video_id).await;

        let weighted = relevance * 0.40
            + ext_quality * 0.20
            + academic_score * 0.15
            + engagement * 0.10
            + freshness * 0.08
            + duration_fit * 0.07;
        let final_score = weighted * 100.0 - 10.0 * clickbait_penalty;

        scored.push(VideoCandidate {
            metadata,
            relevance,
            external_quality: ext_quality,
            academic: academic_score,
            engagement,
            freshness,
            duration_fit,
            clickbait_penalty,
            final_score,
            is_trusted_pick: ext_quality > 0.55,
            matched_query_terms: matched_terms,
            detected_sources_count: sources,
        });
    }

    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(title: &str, views: u64, likes: u64) -> VideoMetadata {
        VideoMetadata {
            video_id: "abcdefghijk".into(),
            title: title.into(),
            channel: "Test Channel".into(),
            channel_id: "UC123".into(),
            description: "a peer-reviewed study with an expert source".into(),
            thumbnail_url: String::new(),
            duration_seconds: 600.0,
            view_count: views,
            like_count: likes,
            upload_date: chrono::Utc::now(),
            detected_language: None,
            search_language: "en".into(),
        }
    }

    #[test]
    fn relevance_gives_title_bonus_when_all_tokens_match() {
        let (score, terms) = score_relevance("machine learning", &metadata("Machine Learning Basics", 0, 0));
        assert!(score > 0.9);
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn relevance_matches_via_synonym() {
        let (score, _) = score_relevance("ia", &metadata("Intro to AI", 0, 0));
        assert!(score > 0.0);
    }

    #[test]
    fn engagement_zero_when_no_views() {
        assert_eq!(score_engagement(&metadata("x", 0, 0)), 0.0);
    }

    #[test]
    fn duration_fit_is_perfect_within_band() {
        let m = metadata("x", 1, 0);
        assert_eq!(score_duration_fit(&m, DurationType::Medium), 1.0);
    }

    #[test]
    fn academic_score_counts_indicator_patterns() {
        let patterns = academic_patterns();
        let (score, hits) = score_academic(&metadata("x", 0, 0), &patterns);
        assert!(hits >= 2);
        assert!(score > 0.0);
    }

    #[test]
    fn clickbait_penalizes_shouting_title() {
        let patterns = clickbait_patterns();
        let penalty = score_clickbait(&metadata("YOU WON'T BELIEVE THIS SHOCKING TWIST", 0, 0), &patterns);
        assert!(penalty > 0.0);
    }
}
