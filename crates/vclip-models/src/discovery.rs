//! Video discovery candidate types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Duration-fit target band for `vclip_core::discovery::scorer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationType {
    Short,
    Medium,
    Long,
    #[default]
    Default,
}

impl DurationType {
    /// `(min_seconds, max_seconds)` of the optimal band for this type.
    pub fn optimal_range(&self) -> (f64, f64) {
        match self {
            DurationType::Short => (180.0, 600.0),
            DurationType::Medium => (600.0, 1800.0),
            DurationType::Long => (1800.0, 5400.0),
            DurationType::Default => (300.0, 3600.0),
        }
    }
}

/// A raw video record as returned by the video searcher, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub channel_id: String,
    pub description: String,
    pub thumbnail_url: String,
    pub duration_seconds: f64,
    pub view_count: u64,
    pub like_count: u64,
    pub upload_date: chrono::DateTime<chrono::Utc>,
    pub detected_language: Option<String>,
    pub search_language: String,
}

/// `VideoMetadata` plus scoring state, as surfaced in a discovery response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoCandidate {
    #[serde(flatten)]
    pub metadata: VideoMetadata,

    pub relevance: f32,
    pub external_quality: f32,
    pub academic: f32,
    pub engagement: f32,
    pub freshness: f32,
    pub duration_fit: f32,
    pub clickbait_penalty: f32,

    pub final_score: f32,
    pub is_trusted_pick: bool,
    pub matched_query_terms: Vec<String>,
    pub detected_sources_count: u8,
}
