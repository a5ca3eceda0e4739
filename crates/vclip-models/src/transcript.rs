//! Transcript extraction result types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The method that ultimately produced a `TranscriptResult`, in catalog
/// order across the three extraction phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    // Phase 1 — parallel text methods
    CaptionApi,
    InnertubeClient,
    WatchPageScrape,
    Invidious,
    Piped,
    // Phase 2 — sequential subprocess methods
    YtDlpManualSubs,
    YtDlpAutoSubs,
    // Phase 3 — audio transcription fallback
    LowLatencyWhisper,
    GeneralWhisper,
    StreamingTranscription,
    AsyncPollTranscription,
}

impl ExtractionMethod {
    pub const PHASE1: [ExtractionMethod; 5] = [
        ExtractionMethod::CaptionApi,
        ExtractionMethod::InnertubeClient,
        ExtractionMethod::WatchPageScrape,
        ExtractionMethod::Invidious,
        ExtractionMethod::Piped,
    ];

    pub const PHASE2: [ExtractionMethod; 2] = [
        ExtractionMethod::YtDlpManualSubs,
        ExtractionMethod::YtDlpAutoSubs,
    ];

    pub const PHASE3: [ExtractionMethod; 4] = [
        ExtractionMethod::LowLatencyWhisper,
        ExtractionMethod::GeneralWhisper,
        ExtractionMethod::StreamingTranscription,
        ExtractionMethod::AsyncPollTranscription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::CaptionApi => "caption_api",
            ExtractionMethod::InnertubeClient => "innertube_client",
            ExtractionMethod::WatchPageScrape => "watch_page_scrape",
            ExtractionMethod::Invidious => "invidious",
            ExtractionMethod::Piped => "piped",
            ExtractionMethod::YtDlpManualSubs => "yt_dlp_manual_subs",
            ExtractionMethod::YtDlpAutoSubs => "yt_dlp_auto_subs",
            ExtractionMethod::LowLatencyWhisper => "low_latency_whisper",
            ExtractionMethod::GeneralWhisper => "general_whisper",
            ExtractionMethod::StreamingTranscription => "streaming_transcription",
            ExtractionMethod::AsyncPollTranscription => "async_poll_transcription",
        }
    }

    /// Prior confidence for this method when no empirical stats are available yet.
    pub fn base_confidence(&self) -> f32 {
        match self {
            ExtractionMethod::CaptionApi => 0.97,
            ExtractionMethod::InnertubeClient => 0.95,
            ExtractionMethod::WatchPageScrape => 0.9,
            ExtractionMethod::Invidious => 0.85,
            ExtractionMethod::Piped => 0.85,
            ExtractionMethod::YtDlpManualSubs => 0.97,
            ExtractionMethod::YtDlpAutoSubs => 0.8,
            ExtractionMethod::LowLatencyWhisper => 0.88,
            ExtractionMethod::GeneralWhisper => 0.9,
            ExtractionMethod::StreamingTranscription => 0.86,
            ExtractionMethod::AsyncPollTranscription => 0.9,
        }
    }

    /// `true` for the subset of methods that produce auto-generated (not
    /// human-authored) captions by construction.
    pub fn is_auto_generated(&self) -> bool {
        matches!(
            self,
            ExtractionMethod::YtDlpAutoSubs
                | ExtractionMethod::LowLatencyWhisper
                | ExtractionMethod::GeneralWhisper
                | ExtractionMethod::StreamingTranscription
                | ExtractionMethod::AsyncPollTranscription
        )
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single caption/transcript segment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub text: String,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// The atomic output of transcript extraction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptResult {
    pub text: String,
    pub text_timestamped: String,
    pub language: String,
    pub method: ExtractionMethod,
    pub is_auto_generated: bool,
    pub confidence: f32,
    pub segments: Option<Vec<Segment>>,
    pub extraction_time_ms: u64,
}
