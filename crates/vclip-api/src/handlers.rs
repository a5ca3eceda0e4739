//! Request handlers.

pub mod chat;
pub mod discovery;
pub mod health;
pub mod transcripts;

pub use health::*;
