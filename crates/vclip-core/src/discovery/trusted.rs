//! External-quality injector (§4.9 step 8): guarantees at least one
//! trusted pick among the top candidates, falling back to a curated seed
//! list when the external recommendation API is silent.

use vclip_models::{VideoCandidate, VideoMetadata};

/// Hardcoded fallback IDs, seeded with long-running, broadly-recognized
/// science/education channels, used only when the external API yields
/// nothing and no existing candidate already qualifies.
const SEED_TRUSTED_IDS: &[&str] = &["8mAITcNt710", "pTn6Ewhb27k", "9RHIRrjpsXA", "cCKONDOJN8I"];

/// `true` if none of the top `window` candidates (by score order) is
/// already a trusted pick.
pub fn needs_trusted_injection(sorted: &[VideoCandidate], window: usize) -> bool {
    !sorted.iter().take(window).any(|c| c.is_trusted_pick)
}

fn seed_candidate(video_id: &str, query: &str) -> VideoCandidate {
    VideoCandidate {
        metadata: VideoMetadata {
            video_id: video_id.to_string(),
            title: format!("Curated pick for \"{query}\""),
            channel: "Curated".to_string(),
            channel_id: "curated".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            duration_seconds: 0.0,
            view_count: 0,
            like_count: 0,
            upload_date: chrono::Utc::now(),
            detected_language: None,
            search_language: "en".to_string(),
        },
        relevance: 0.0,
        external_quality: 1.0,
        academic: 0.0,
        engagement: 0.0,
        freshness: 0.0,
        duration_fit: 0.0,
        clickbait_penalty: 0.0,
        final_score: 100.0,
        is_trusted_pick: true,
        matched_query_terms: Vec::new(),
        detected_sources_count: 0,
    }
}

/// Pick one seed ID not already present in `existing_ids`.
pub fn pick_seed(existing_ids: &[String], query: &str) -> Option<VideoCandidate> {
    SEED_TRUSTED_IDS
        .iter()
        .find(|id| !existing_ids.iter().any(|existing| existing == *id))
        .map(|id| seed_candidate(id, query))
}

/// Splice `candidate` at 1-indexed position 3 (index 2), shifting the rest
/// down, matching §4.9's "splice at position 3" rule.
pub fn splice_at_position_three(candidates: &mut Vec<VideoCandidate>, candidate: VideoCandidate) {
    let index = candidates.len().min(2);
    candidates.insert(index, candidate);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(trusted: bool) -> VideoCandidate {
        let mut c = seed_candidate("x", "q");
        c.is_trusted_pick = trusted;
        c
    }

    #[test]
    fn detects_missing_trusted_pick() {
        let sorted = vec![candidate(false), candidate(false)];
        assert!(needs_trusted_injection(&sorted, 5));
    }

    #[test]
    fn does_not_inject_when_trusted_pick_present() {
        let sorted = vec![candidate(false), candidate(true)];
        assert!(!needs_trusted_injection(&sorted, 5));
    }

    #[test]
    fn splice_inserts_at_third_position() {
        let mut candidates = vec![candidate(false), candidate(false), candidate(false), candidate(false)];
        splice_at_position_three(&mut candidates, seed_candidate("new", "q"));
        assert_eq!(candidates[2].metadata.video_id, "new");
    }

    #[test]
    fn pick_seed_skips_existing_ids() {
        let existing = vec![SEED_TRUSTED_IDS[0].to_string()];
        let picked = pick_seed(&existing, "q").unwrap();
        assert_ne!(picked.metadata.video_id, SEED_TRUSTED_IDS[0]);
    }
}
