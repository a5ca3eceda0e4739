use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("client not configured: missing API key")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("response parsing failed: {0}")]
    Parse(String),

    #[error("all providers exhausted")]
    Exhausted,
}
