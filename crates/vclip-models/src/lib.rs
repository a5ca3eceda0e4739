//! Shared data models for the video-intelligence backend.
//!
//! This crate provides Serde-serializable types for:
//! - Transcript extraction results and the method catalog
//! - Discovery candidates and scoring axes
//! - Chat messages, enrichment levels, and plan tiers
//! - Circuit breaker / instance health / method statistics snapshots
//! - YouTube URL and timestamp parsing helpers shared across crates

pub mod chat;
pub mod discovery;
pub mod health;
pub mod plan;
pub mod timestamp;
pub mod transcript;
pub mod utils;

pub use chat::{ChatMessage, ChatRole, EnrichmentLevel, QuotaStatus, Summary};
pub use discovery::{DurationType, VideoCandidate, VideoMetadata};
pub use health::{CircuitState, ErrorClass, InstanceHealth, MethodStats};
pub use plan::{PlanLimits, PlanTier};
pub use transcript::{ExtractionMethod, Segment, TranscriptResult};
pub use utils::{extract_youtube_id, extract_youtube_id_legacy, YoutubeIdError, YoutubeIdResult};
