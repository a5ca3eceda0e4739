//! Transcript extraction, discovery, and chat-enrichment engines.
//!
//! This crate holds the resilience primitives (cache, circuit breaker,
//! instance health, rate limiter, health monitor) and the three
//! orchestrators built on top of them: transcript extraction, video
//! discovery, and chat enrichment.

pub mod backoff;
pub mod cache;
pub mod chat;
pub mod circuit_breaker;
pub mod config;
pub mod discovery;
pub mod error;
pub mod health_monitor;
pub mod instance_health;
pub mod rate_limiter;
pub mod repository;
pub mod transcript;

pub use cache::Cache;
pub use chat::ChatService;
pub use circuit_breaker::CircuitBreakerRegistry;
pub use config::CoreConfig;
pub use discovery::DiscoveryOrchestrator;
pub use error::{ChatError, CoreError, CoreResult, DiscoveryError, TranscriptError};
pub use health_monitor::HealthMonitor;
pub use instance_health::InstanceHealthRegistry;
pub use rate_limiter::TokenBucket;
pub use transcript::TranscriptExtractor;
