//! Error taxonomy for the core engines.
//!
//! Mirrors the shape of the teacher's `ApiError`: a flat, constructor-driven
//! `thiserror` enum with classification helpers. Component-level errors are
//! kept separate and convert into `CoreError` at the orchestrator boundary,
//! the way the teacher's `WorkerError` wraps `StorageError`/`FirestoreError`.

use thiserror::Error;

/// Error raised by an individual transcript extraction method.
#[derive(Debug, Error, Clone)]
#[error("{method}: {message}")]
pub struct MethodError {
    pub method: String,
    pub message: String,
}

impl MethodError {
    pub fn new(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Errors from the transcript extractor.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("invalid video url or id: {0}")]
    InvalidInput(String),

    #[error("failed to extract transcript after {attempts} attempts. Errors: {}", format_method_errors(.errors))]
    Exhausted {
        attempts: usize,
        errors: Vec<MethodError>,
    },
}

fn format_method_errors(errors: &[MethodError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from the discovery orchestrator.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("query reformulation failed: {0}")]
    Reformulation(String),

    #[error("video search failed: {0}")]
    Search(String),

    #[error("quality scoring failed: {0}")]
    Scoring(String),
}

/// Errors from the chat service and enrichment controller.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("daily chat limit reached ({used}/{limit})")]
    DailyLimitReached { used: i64, limit: i64 },

    #[error("per-video chat limit reached ({used}/{limit})")]
    VideoLimitReached { used: i64, limit: i64 },

    #[error("summary not found")]
    SummaryNotFound,

    #[error("user does not own this summary")]
    PermissionDenied,

    #[error("language model unavailable: {0}")]
    LlmUnavailable(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

/// The top-level, HTTP-facing error. Component errors convert into this at
/// the orchestrator boundary via `#[from]`, mirroring the teacher's
/// `ApiError::Storage(#[from] StorageError)` pattern.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("video not found")]
    VideoNotFound,

    #[error("rate limited, retry later")]
    RateLimited,

    #[error("quota exceeded")]
    QuotaExceeded {
        daily_limit: i64,
        daily_used: i64,
        required_plan: Option<String>,
    },

    #[error("fact check unavailable")]
    FactCheckUnavailable,

    #[error("language model unavailable: {0}")]
    LlmUnavailable(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("transcript not available: {0}")]
    TranscriptNotAvailable(#[from] TranscriptError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::VideoNotFound => "video_not_found",
            CoreError::RateLimited => "rate_limited",
            CoreError::QuotaExceeded { .. } => "quota_exceeded",
            CoreError::FactCheckUnavailable => "fact_check_unavailable",
            CoreError::LlmUnavailable(_) => "llm_unavailable",
            CoreError::PermissionDenied => "permission_denied",
            CoreError::TranscriptNotAvailable(_) => "transcript_not_available",
            CoreError::Discovery(_) => "discovery_failed",
            CoreError::Chat(chat_err) => match chat_err {
                ChatError::DailyLimitReached { .. } => "quota_exceeded",
                ChatError::VideoLimitReached { .. } => "quota_exceeded",
                ChatError::SummaryNotFound => "video_not_found",
                ChatError::PermissionDenied => "permission_denied",
                ChatError::LlmUnavailable(_) => "llm_unavailable",
                ChatError::Persistence(_) => "llm_unavailable",
            },
        }
    }

    /// Whether retrying the same request immediately is reasonable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::RateLimited | CoreError::LlmUnavailable(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
