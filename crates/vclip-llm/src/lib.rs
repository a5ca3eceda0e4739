//! Clients for the outbound language-model and transcription APIs.
//!
//! Grounded on the teacher's `services::gemini::GeminiClient`: a thin
//! `reqwest`-based client, a multi-model fallback loop, and markdown-fence
//! stripping before JSON parsing. Generalized here into provider-agnostic
//! traits so the core engines depend on behavior, not on a vendor.

pub mod completion;
pub mod content_rating;
pub mod error;
pub mod search;
pub mod transcription;

pub use completion::{ChatTurn, CompletionClient, CompletionRequest, HttpCompletionClient};
pub use content_rating::{ContentRatingClient, HttpContentRatingClient};
pub use error::LlmError;
pub use search::{HttpSearchClient, SearchAugmentedClient, SearchAugmentedResponse};
pub use transcription::{
    AsyncPollTranscriptionProvider, GeneralWhisperProvider, LowLatencyWhisperProvider,
    StreamingTranscriptionProvider, TranscriptionProvider,
};
