//! LLM integration for the meeting agent
//!
//! Features:
//! - Pluggable chat backend (Ollama-compatible HTTP API) with bounded retry
//! - Closed-enum intent classifiers with strict parse-or-fallback semantics
//! - Process-wide TTL cache for classification verdicts
//! - Global minimum-interval throttle to smooth bursts against the upstream
//!   rate limit

pub mod backend;
pub mod cache;
pub mod classify;
pub mod prompt;
pub mod throttle;

pub use backend::{GenerationResult, LlmBackend, LlmConfig, OllamaBackend};
pub use cache::ClassifyCache;
pub use classify::{
    Classifier, Confirmation, ContactTurnIntent, NewBookingIntent, RouteIntent,
};
pub use prompt::{Message, Role};
pub use throttle::Throttle;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
